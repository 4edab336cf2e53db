mod blend;

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use blend::{Blend, BlendPolicy, OVERRIDING_SCORE};

use crate::clock::Clock;
use crate::context::ContextKey;
use crate::error::Result;
use crate::model::UserOverrideModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub value: String,
    pub score: f64,
}

impl ScoredCandidate {
    pub fn new(value: impl Into<String>, score: f64) -> Self {
        Self {
            value: value.into(),
            score,
        }
    }
}

impl<S: Into<String>> From<(S, f64)> for ScoredCandidate {
    fn from((value, score): (S, f64)) -> Self {
        Self::new(value, score)
    }
}

/// Reorders language-model candidates using the override store.
pub struct OverrideRanker {
    model: Arc<UserOverrideModel>,
    policy: Box<dyn BlendPolicy>,
    clock: Arc<dyn Clock>,
}

impl OverrideRanker {
    pub fn new(model: Arc<UserOverrideModel>, blend: Blend, clock: Arc<dyn Clock>) -> Result<Self> {
        blend.validate()?;
        Ok(Self::with_policy(model, Box::new(blend), clock))
    }

    pub fn with_policy(
        model: Arc<UserOverrideModel>,
        policy: Box<dyn BlendPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            model,
            policy,
            clock,
        }
    }

    pub fn model(&self) -> &Arc<UserOverrideModel> {
        &self.model
    }

    pub fn rank(&self, key: &ContextKey, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        self.rank_at(key, candidates, self.clock.now())
    }

    pub fn rank_at(
        &self,
        key: &ContextKey,
        candidates: Vec<ScoredCandidate>,
        now: f64,
    ) -> Vec<ScoredCandidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let weights = self.model.query(key, now);
        let mut ranked: Vec<(ScoredCandidate, f64)> = candidates
            .into_iter()
            .map(|c| {
                let weight = weights.get(&c.value).copied().unwrap_or(0.0);
                let score = self.policy.combine(c.score, weight);
                (ScoredCandidate { score, ..c }, weight)
            })
            .collect();

        // 混合后分数相同时（浮点吸收了极小的权重）权重大的在前；
        // sort_by 是稳定排序，其余同分保持输入顺序
        ranked.sort_by(|a, b| {
            descending(a.0.score, b.0.score).then_with(|| b.1.total_cmp(&a.1))
        });
        ranked.into_iter().map(|(candidate, _)| candidate).collect()
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
