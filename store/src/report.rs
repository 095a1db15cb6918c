//! Verification report storage trait.

use crate::StoreError;
use veriflow_types::{VerificationId, VerificationReport};

/// Reports are immutable once written.
pub trait ReportStore {
    /// Store the report. Fails with `Duplicate` if one already exists for the run.
    fn put_report(&self, report: &VerificationReport) -> Result<(), StoreError>;

    fn get_report(&self, id: &VerificationId) -> Result<VerificationReport, StoreError>;

    /// Remove a report whose run never reached `completed`. Absent is not an error.
    fn delete_report(&self, id: &VerificationId) -> Result<(), StoreError>;
}
