use std::collections::HashMap;

use super::OverrideEntry;
use crate::context::ContextKey;

/// Picks the entry to drop when a new key arrives at capacity: lowest best
/// weight first, then the entry touched longest ago, then the smallest key.
pub(super) fn select_victim<'a>(
    entries: &'a HashMap<ContextKey, OverrideEntry>,
    now: f64,
    halflife: f64,
) -> Option<&'a ContextKey> {
    entries
        .iter()
        .map(|(key, entry)| (key, entry.max_weight(now, halflife), entry.last_touched()))
        .min_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| a.2.total_cmp(&b.2))
                .then_with(|| a.0.cmp(b.0))
        })
        .map(|(key, _, _)| key)
}
