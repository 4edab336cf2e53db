use std::collections::BTreeMap;

use override_engine::{ContextKey, ReadingValue, ScoredCandidate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    Record(RecordRequest),
    Query(QueryRequest),
    Rank(RankRequest),
    Suggest(QueryRequest),
    Stats,
    Ping,
}

/// Either a prebuilt key or the reading/value window it is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextInput {
    Key(String),
    Window {
        #[serde(default)]
        preceding: Vec<ReadingValue>,
        reading: String,
        #[serde(default)]
        following: Vec<ReadingValue>,
    },
}

impl ContextInput {
    pub fn to_key(&self) -> ContextKey {
        match self {
            ContextInput::Key(raw) => ContextKey::new(raw),
            ContextInput::Window {
                preceding,
                reading,
                following,
            } => ContextKey::from_window(preceding, reading, following),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRequest {
    pub context: ContextInput,
    pub candidate: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub context: ContextInput,
    #[serde(default)]
    pub now: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankRequest {
    pub context: ContextInput,
    #[serde(default)]
    pub candidates: Vec<ScoredCandidate>,
    #[serde(default)]
    pub now: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBody {
    Recorded { entries: usize },
    Weights { weights: BTreeMap<String, f64> },
    Ranked { candidates: Vec<ScoredCandidate> },
    Suggestion {
        candidate: Option<String>,
        weight: f64,
    },
    Stats(StatsResponse),
    Pong,
    Error(ErrorResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub entries: usize,
    pub capacity: usize,
    pub halflife: f64,
    pub loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    Internal,
}

impl DaemonResponse {
    pub fn error(id: String, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            body: ResponseBody::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        }
    }
}
