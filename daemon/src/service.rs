use std::sync::Arc;

use anyhow::Result;
use override_engine::{Blend, Clock, OverrideConfig, OverrideRanker, UserOverrideModel};
use tracing::debug;

use crate::protocol::{
    QueryRequest, RankRequest, RecordRequest, RequestBody, ResponseBody, StatsResponse,
};

/// Owns the process-wide override store and the ranker reading from it.
pub struct OverrideService {
    model: Arc<UserOverrideModel>,
    ranker: OverrideRanker,
    clock: Arc<dyn Clock>,
}

impl OverrideService {
    pub fn new(model: OverrideConfig, ranking: Blend, clock: Arc<dyn Clock>) -> Result<Self> {
        let model = Arc::new(UserOverrideModel::with_config(model)?);
        let ranker = OverrideRanker::new(model.clone(), ranking, clock.clone())?;
        Ok(Self {
            model,
            ranker,
            clock,
        })
    }

    pub fn handle(&self, body: RequestBody) -> ResponseBody {
        match body {
            RequestBody::Record(request) => self.record(request),
            RequestBody::Query(request) => self.query(request),
            RequestBody::Rank(request) => self.rank(request),
            RequestBody::Suggest(request) => self.suggest(request),
            RequestBody::Stats => ResponseBody::Stats(StatsResponse {
                entries: self.model.len(),
                capacity: self.model.capacity(),
                halflife: self.model.halflife(),
                loaded: self.model.is_loaded(),
            }),
            RequestBody::Ping => ResponseBody::Pong,
        }
    }

    fn record(&self, request: RecordRequest) -> ResponseBody {
        let key = request.context.to_key();
        let timestamp = request.timestamp.unwrap_or_else(|| self.clock.now());
        self.model.record(&key, &request.candidate, timestamp);
        debug!(context = %key, candidate = %request.candidate, timestamp, "recorded override");
        ResponseBody::Recorded {
            entries: self.model.len(),
        }
    }

    fn query(&self, request: QueryRequest) -> ResponseBody {
        let now = request.now.unwrap_or_else(|| self.clock.now());
        ResponseBody::Weights {
            weights: self.model.query(&request.context.to_key(), now),
        }
    }

    fn rank(&self, request: RankRequest) -> ResponseBody {
        let key = request.context.to_key();
        let candidates = match request.now {
            Some(now) => self.ranker.rank_at(&key, request.candidates, now),
            None => self.ranker.rank(&key, request.candidates),
        };
        ResponseBody::Ranked { candidates }
    }

    fn suggest(&self, request: QueryRequest) -> ResponseBody {
        let now = request.now.unwrap_or_else(|| self.clock.now());
        match self.model.suggest(&request.context.to_key(), now) {
            Some(s) => ResponseBody::Suggestion {
                candidate: Some(s.candidate),
                weight: s.weight,
            },
            None => ResponseBody::Suggestion {
                candidate: None,
                weight: 0.0,
            },
        }
    }
}
