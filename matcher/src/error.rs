use thiserror::Error;
use vigil_featstore::StoreError;

/// Errors returned by classifiers.
///
/// An ambiguous or distant query is not an error: it yields
/// [`vigil_stabilizer::Verdict::NoMatch`].
#[derive(Debug, Error)]
pub enum MatchError {
    /// Malformed query vector: wrong dimensionality or non-finite components.
    #[error("matcher: invalid input: {0}")]
    InvalidInput(String),

    #[error("matcher: invalid config: {0}")]
    InvalidConfig(String),

    /// Store failure on a diagnostics path. Classification itself degrades
    /// to `NoMatch` instead.
    #[error("matcher: {0}")]
    Store(#[from] StoreError),
}

impl MatchError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, MatchError::InvalidInput(_))
    }
}
