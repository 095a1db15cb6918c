//! Fundamental types for Veriflow.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, timestamps, verification/agent tags, the status state machine, and the
//! four persisted records (request, evidence snapshot, check result, report).

pub mod check;
pub mod error;
pub mod evidence;
pub mod id;
pub mod kind;
pub mod report;
pub mod request;
pub mod status;
pub mod time;

pub use check::{CheckItem, CheckResult};
pub use error::TypesError;
pub use evidence::{BeneficialOwner, EvidenceSnapshot};
pub use id::{SubjectId, VerificationId};
pub use kind::{AgentKind, VerificationType};
pub use report::{Tally, UboReference, VerificationReport};
pub use request::{AdditionalData, VerificationRequest};
pub use status::{CheckStatus, OverallStatus, VerificationStatus};
pub use time::{Clock, SystemClock, Timestamp};
