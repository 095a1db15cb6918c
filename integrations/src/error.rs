use thiserror::Error;

/// Failure talking to an external collaborator.
///
/// Only `Transient` is ever retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExternalError {
    #[error("external service temporarily unavailable: {0}")]
    Transient(String),

    #[error("external service rejected the request: {0}")]
    Permanent(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl ExternalError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
