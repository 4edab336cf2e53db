use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OverrideError {
    #[error("override capacity must be positive")]
    InvalidCapacity,

    #[error("override halflife must be positive and finite, got {0}")]
    InvalidHalflife(f64),

    #[error("invalid blend policy: {0}")]
    InvalidBlend(String),
}

pub type Result<T> = std::result::Result<T, OverrideError>;
