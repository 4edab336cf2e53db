pub mod clock;
pub mod context;
pub mod error;
pub mod model;
pub mod ranker;

#[cfg(test)]
mod tests_proptest;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{ContextKey, ReadingValue, CONTEXT_WINDOW};
pub use error::{OverrideError, Result};
pub use model::{Observation, OverrideConfig, Suggestion, UserOverrideModel};
pub use ranker::{Blend, BlendPolicy, OverrideRanker, ScoredCandidate};
