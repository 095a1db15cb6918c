//! Check result storage trait.

use crate::StoreError;
use veriflow_types::{CheckResult, VerificationId};

/// Append-only log of check results per verification.
pub trait CheckResultStore {
    fn append_result(&self, result: &CheckResult) -> Result<(), StoreError>;

    /// All results for a run, in append order.
    fn results(&self, id: &VerificationId) -> Result<Vec<CheckResult>, StoreError>;
}
