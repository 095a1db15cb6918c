//! Evidence snapshot storage trait.

use crate::StoreError;
use veriflow_types::{EvidenceSnapshot, VerificationId};

/// Snapshots are write-once: exactly one per verification.
pub trait EvidenceStore {
    /// Store the snapshot. Fails with `Duplicate` if one already exists for the run.
    fn put_snapshot(&self, snapshot: &EvidenceSnapshot) -> Result<(), StoreError>;

    fn get_snapshot(&self, id: &VerificationId) -> Result<EvidenceSnapshot, StoreError>;
}
