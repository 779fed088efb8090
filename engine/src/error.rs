use thiserror::Error;
use vigil_featstore::StoreError;
use vigil_matcher::MatchError;

use crate::stream::StreamId;

/// Errors returned by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine: {0}")]
    Match(#[from] MatchError),

    #[error("engine: {0}")]
    Store(#[from] StoreError),

    /// The orchestrator was built without this stream.
    #[error("engine: stream {0} is not configured")]
    StreamNotConfigured(StreamId),

    #[error("engine: config: {0}")]
    Config(String),

    #[error("engine: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine: yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl EngineError {
    /// True when a frame was rejected for a malformed vector.
    pub fn is_invalid_input(&self) -> bool {
        match self {
            EngineError::Match(e) => e.is_invalid_input(),
            EngineError::Store(e) => e.is_invalid_input(),
            _ => false,
        }
    }
}
