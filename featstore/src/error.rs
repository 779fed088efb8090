use thiserror::Error;

use crate::types::SubjectId;

/// Errors returned by feature store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The subject does not exist, or is inactive where an active one is required.
    #[error("featstore: unknown subject {0}")]
    UnknownSubject(SubjectId),

    #[error("featstore: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("featstore: invalid input: {0}")]
    InvalidInput(String),

    /// The persistence backend failed.
    #[error("featstore: store unavailable: {0}")]
    Unavailable(String),

    #[error("featstore: serialization error: {0}")]
    Serialization(String),

    /// The store on disk was created with a different dimension or metric.
    #[error("featstore: metadata mismatch: {0}")]
    MetaMismatch(String),
}

impl StoreError {
    /// True for errors caused by a malformed argument rather than store state.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            StoreError::DimensionMismatch { .. } | StoreError::InvalidInput(_)
        )
    }
}

impl From<vigil_kv::KVError> for StoreError {
    fn from(e: vigil_kv::KVError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}
