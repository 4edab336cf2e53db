use serde::{Deserialize, Serialize};

use crate::error::{OverrideError, Result};

/// 覆盖候选被选中时引擎给出的分数。
pub const OVERRIDING_SCORE: f64 = 42.0;

/// Merges a base language-model score with an override weight. Implementations
/// must be non-decreasing in both arguments and return `base` for a zero weight.
/// A tiny weight may round away entirely; the ranker then orders equal scores
/// by weight, so an overridden candidate still beats an equal base.
pub trait BlendPolicy: Send + Sync {
    fn combine(&self, base: f64, weight: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Blend {
    /// `base + boost * weight`
    Additive {
        #[serde(default = "default_boost")]
        boost: f64,
    },
    /// `base + bonus` once the weight exceeds `threshold`.
    Threshold {
        #[serde(default)]
        threshold: f64,
        #[serde(default = "default_boost")]
        bonus: f64,
    },
}

impl Default for Blend {
    fn default() -> Self {
        Blend::Additive {
            boost: default_boost(),
        }
    }
}

fn default_boost() -> f64 {
    OVERRIDING_SCORE
}

impl Blend {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Blend::Additive { boost } => {
                if !(boost.is_finite() && boost > 0.0) {
                    return Err(OverrideError::InvalidBlend(format!(
                        "additive boost must be positive, got {boost}"
                    )));
                }
            }
            Blend::Threshold { threshold, bonus } => {
                if !(threshold.is_finite() && threshold >= 0.0) {
                    return Err(OverrideError::InvalidBlend(format!(
                        "threshold must be non-negative, got {threshold}"
                    )));
                }
                if !(bonus.is_finite() && bonus > 0.0) {
                    return Err(OverrideError::InvalidBlend(format!(
                        "threshold bonus must be positive, got {bonus}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl BlendPolicy for Blend {
    fn combine(&self, base: f64, weight: f64) -> f64 {
        let weight = weight.max(0.0);
        match *self {
            Blend::Additive { boost } => base + boost * weight,
            Blend::Threshold { threshold, bonus } => {
                if weight > threshold {
                    base + bonus
                } else {
                    base
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_keeps_base() {
        for blend in [
            Blend::default(),
            Blend::Threshold {
                threshold: 0.1,
                bonus: 10.0,
            },
        ] {
            assert_eq!(blend.combine(-7.5, 0.0), -7.5);
        }
    }

    #[test]
    fn additive_is_monotonic() {
        let blend = Blend::default();
        assert!(blend.combine(1.0, 0.5) > blend.combine(1.0, 0.25));
        assert!(blend.combine(2.0, 0.5) > blend.combine(1.0, 0.5));
    }

    #[test]
    fn threshold_switches_on() {
        let blend = Blend::Threshold {
            threshold: 0.5,
            bonus: 42.0,
        };
        assert_eq!(blend.combine(-3.0, 0.4), -3.0);
        assert_eq!(blend.combine(-3.0, 0.6), 39.0);
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(Blend::Additive { boost: 0.0 }.validate().is_err());
        assert!(Blend::Threshold {
            threshold: -1.0,
            bonus: 1.0
        }
        .validate()
        .is_err());
        assert!(Blend::Threshold {
            threshold: 0.0,
            bonus: 0.0
        }
        .validate()
        .is_err());
        assert!(Blend::default().validate().is_ok());
    }

    #[test]
    fn parses_tagged_config() {
        let blend: Blend =
            serde_json::from_str(r#"{"kind":"threshold","threshold":0.2,"bonus":99}"#).unwrap();
        assert_eq!(
            blend,
            Blend::Threshold {
                threshold: 0.2,
                bonus: 99.0
            }
        );
        let blend: Blend = serde_json::from_str(r#"{"kind":"additive"}"#).unwrap();
        assert_eq!(blend, Blend::default());
    }
}
