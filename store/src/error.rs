use thiserror::Error;
use veriflow_types::{TypesError, VerificationStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("invalid transition for {id}: {source}")]
    InvalidTransition {
        id: String,
        #[source]
        source: TypesError,
    },

    #[error("status of {id} is {found}, expected {expected}")]
    Conflict {
        id: String,
        expected: VerificationStatus,
        found: VerificationStatus,
    },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Another writer moved the record first.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
