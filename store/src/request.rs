//! Verification request storage trait.

use crate::StoreError;
use veriflow_types::{Timestamp, VerificationId, VerificationRequest, VerificationStatus};

/// Trait for storing verification requests, the authoritative status records.
pub trait VerificationStore {
    /// Insert a new request. Fails with `Duplicate` if the id exists.
    fn create_request(&self, request: &VerificationRequest) -> Result<(), StoreError>;

    /// Fetch a request by id.
    fn get_request(&self, id: &VerificationId) -> Result<VerificationRequest, StoreError>;

    /// Atomically apply a checked status transition and return the updated record.
    ///
    /// Fails with `InvalidTransition` (and leaves the record untouched) when the move
    /// is not allowed from the stored status.
    fn transition(
        &self,
        id: &VerificationId,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<VerificationRequest, StoreError>;

    /// Like [`transition`](Self::transition), but only when the stored status is
    /// still `expected`. Fails with `Conflict` otherwise, leaving the record
    /// untouched.
    fn transition_from(
        &self,
        id: &VerificationId,
        expected: VerificationStatus,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<VerificationRequest, StoreError>;

    /// All requests whose `parent_verification_id` is `parent`.
    fn children(&self, parent: &VerificationId) -> Result<Vec<VerificationRequest>, StoreError>;

    /// Number of stored requests.
    fn request_count(&self) -> Result<u64, StoreError>;
}
