/// Exponential decay with half-life `halflife`:
/// `count * 2 ^ (-(now - last_timestamp) / halflife)`.
///
/// Elapsed time is clamped at zero so a `now` behind the observation never
/// weighs more than `count`.
pub fn decayed_weight(count: u32, last_timestamp: f64, now: f64, halflife: f64) -> f64 {
    let elapsed = (now - last_timestamp).max(0.0);
    count as f64 * (-elapsed / halflife).exp2()
}
