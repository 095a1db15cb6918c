//! Top-level error type shared across crates.

use thiserror::Error;

use crate::VerificationStatus;

/// Errors raised while constructing or transitioning core types.
#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: VerificationStatus,
        to: VerificationStatus,
    },

    #[error("unknown verification type: {0}")]
    UnknownVerificationType(String),

    #[error("unknown agent kind: {0}")]
    UnknownAgentKind(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("malformed evidence document {name}: {reason}")]
    MalformedDocument { name: String, reason: String },
}
