mod decay;
mod eviction;

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use decay::decayed_weight;
use eviction::select_victim;

use crate::context::ContextKey;
use crate::error::{OverrideError, Result};

pub const DEFAULT_CAPACITY: usize = 500;
/// 1.5 小时
pub const DEFAULT_HALFLIFE: f64 = 5400.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_halflife")]
    pub halflife: f64,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            halflife: default_halflife(),
        }
    }
}

impl OverrideConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(OverrideError::InvalidCapacity);
        }
        if !(self.halflife.is_finite() && self.halflife > 0.0) {
            return Err(OverrideError::InvalidHalflife(self.halflife));
        }
        Ok(())
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_halflife() -> f64 {
    DEFAULT_HALFLIFE
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub count: u32,
    pub last_timestamp: f64,
}

impl Observation {
    pub fn weight(&self, now: f64, halflife: f64) -> f64 {
        decayed_weight(self.count, self.last_timestamp, now, halflife)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub candidate: String,
    pub weight: f64,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct OverrideEntry {
    pub(crate) observations: HashMap<String, Observation>,
}

impl OverrideEntry {
    pub(crate) fn max_weight(&self, now: f64, halflife: f64) -> f64 {
        self.observations
            .values()
            .map(|o| o.weight(now, halflife))
            .fold(0.0, f64::max)
    }

    pub(crate) fn last_touched(&self) -> f64 {
        self.observations
            .values()
            .map(|o| o.last_timestamp)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<ContextKey, OverrideEntry>,
}

/// Bounded, time-decayed memory of which candidate the user picked in a given
/// context. Every operation runs under one lock and never blocks on I/O.
#[derive(Debug)]
pub struct UserOverrideModel {
    capacity: usize,
    halflife: f64,
    table: Mutex<Table>,
}

impl UserOverrideModel {
    pub fn new(capacity: usize, halflife: f64) -> Result<Self> {
        Self::with_config(OverrideConfig { capacity, halflife })
    }

    pub fn with_config(config: OverrideConfig) -> Result<Self> {
        config.validate()?;
        info!(
            capacity = config.capacity,
            halflife = config.halflife,
            "user override model ready"
        );
        Ok(Self {
            capacity: config.capacity,
            halflife: config.halflife,
            table: Mutex::new(Table::default()),
        })
    }

    pub fn record(&self, key: &ContextKey, candidate: &str, timestamp: f64) {
        let mut table = self.table.lock();

        if !table.entries.contains_key(key) && table.entries.len() >= self.capacity {
            let victim = select_victim(&table.entries, timestamp, self.halflife).cloned();
            if let Some(victim) = victim {
                debug!(evicted = %victim, incoming = %key, "override table at capacity");
                table.entries.remove(&victim);
            }
        }

        let entry = table.entries.entry(key.clone()).or_default();
        match entry.observations.get_mut(candidate) {
            Some(observation) => {
                observation.count = observation.count.saturating_add(1);
                observation.last_timestamp = observation.last_timestamp.max(timestamp);
            }
            None => {
                entry.observations.insert(
                    candidate.to_string(),
                    Observation {
                        count: 1,
                        last_timestamp: timestamp,
                    },
                );
            }
        }
    }

    /// Current decayed weight of every remembered candidate for `key`; empty
    /// when the key was never recorded (or has been evicted).
    pub fn query(&self, key: &ContextKey, now: f64) -> BTreeMap<String, f64> {
        let table = self.table.lock();
        table
            .entries
            .get(key)
            .map(|entry| {
                entry
                    .observations
                    .iter()
                    .map(|(candidate, o)| (candidate.clone(), o.weight(now, self.halflife)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn suggest(&self, key: &ContextKey, now: f64) -> Option<Suggestion> {
        let table = self.table.lock();
        let entry = table.entries.get(key)?;
        entry
            .observations
            .iter()
            .map(|(candidate, o)| (candidate, o.weight(now, self.halflife), o.last_timestamp))
            .max_by(|a, b| {
                a.1.total_cmp(&b.1)
                    .then_with(|| a.2.total_cmp(&b.2))
                    // 反向比较：同分同时刻时取字典序较小者
                    .then_with(|| b.0.cmp(a.0))
            })
            .map(|(candidate, weight, _)| Suggestion {
                candidate: candidate.clone(),
                weight,
            })
    }

    pub fn observation(&self, key: &ContextKey, candidate: &str) -> Option<Observation> {
        let table = self.table.lock();
        table.entries.get(key)?.observations.get(candidate).copied()
    }

    pub fn is_loaded(&self) -> bool {
        true
    }

    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn halflife(&self) -> f64 {
        self.halflife
    }
}
