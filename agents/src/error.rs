use thiserror::Error;
use veriflow_integrations::ExternalError;
use veriflow_types::TypesError;

/// Failure of a single agent. Never aborts siblings; the scheduler turns it into a
/// failed `CheckResult`.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("required evidence document missing: {0}")]
    MissingDocument(String),

    #[error("evidence document {document} is malformed: {reason}")]
    MalformedDocument { document: String, reason: String },

    #[error("external call failed: {0}")]
    External(#[from] ExternalError),

    #[error(transparent)]
    Types(#[from] TypesError),
}
