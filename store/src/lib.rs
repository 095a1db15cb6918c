//! Storage traits for Veriflow records.
//!
//! Every backend implements these traits and the rest of the workspace depends only
//! on them. All four record kinds are keyed by `VerificationId`. [`MemoryStore`] is the
//! in-process backend used by the engine by default and by every test.

pub mod error;
pub mod evidence;
pub mod memory;
pub mod report;
pub mod request;
pub mod result;

pub use error::StoreError;
pub use evidence::EvidenceStore;
pub use memory::MemoryStore;
pub use report::ReportStore;
pub use request::VerificationStore;
pub use result::CheckResultStore;

/// Everything a workflow needs from persistence, as one object-safe bound.
pub trait RecordStore:
    VerificationStore + EvidenceStore + CheckResultStore + ReportStore + Send + Sync
{
}

impl<T> RecordStore for T where
    T: VerificationStore + EvidenceStore + CheckResultStore + ReportStore + Send + Sync
{
}
