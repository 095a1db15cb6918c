use thiserror::Error;

use veriflow_store::StoreError;
use veriflow_types::VerificationId;

use crate::acquisition::AcquisitionError;
use crate::compiler::CompilationError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("compilation failed: {0}")]
    Compilation(#[from] CompilationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("verification {0} not found")]
    NotFound(VerificationId),

    #[error("invalid subject id: {0:?}")]
    InvalidSubject(String),

    #[error("verification cancelled")]
    Cancelled,

    #[error("workflow exceeded its time limit")]
    WorkflowTimeout,

    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("engine already started")]
    AlreadyStarted,

    #[error("engine not started")]
    NotStarted,

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// The reason recorded on a request this error failed.
    pub fn failure_reason(&self) -> String {
        match self {
            Self::Acquisition(e) => e.reason().to_string(),
            Self::Compilation(e) => format!("compilation_failed: {e}"),
            Self::Store(e) => format!("store_error: {e}"),
            Self::Cancelled => "cancelled".to_string(),
            Self::WorkflowTimeout => "workflow_timeout".to_string(),
            Self::ShuttingDown => "shutdown".to_string(),
            other => other.to_string(),
        }
    }
}
