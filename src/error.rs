use thiserror::Error;

/// Failures surfaced by the scoring and learning core.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed result or outcome payload. Never retried.
    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),

    /// Every fixture source failed.
    #[error("fixture source unavailable: {0}")]
    SourceUnavailable(String),

    /// The weight-state or outcome store could not be read or written.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::PersistenceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::PersistenceFailure(format!("state encoding: {}", err))
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
