//! The verification request record: the authoritative status of one run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{SubjectId, Timestamp, TypesError, VerificationId, VerificationStatus, VerificationType};

/// Opaque caller-supplied key/value data, recorded verbatim in the evidence snapshot.
pub type AdditionalData = BTreeMap<String, serde_json::Value>;

/// One verification run.
///
/// Created `Pending` at intake. Status only moves forward through
/// [`VerificationRequest::advance`]; a terminal request is never re-opened, and
/// re-verifying the same subject creates a new request with a new id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: VerificationId,
    pub verification_type: VerificationType,
    pub subject_id: SubjectId,
    #[serde(default)]
    pub additional_data: AdditionalData,
    pub status: VerificationStatus,
    pub created_at: Timestamp,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    /// Set only on UBO sub-verifications.
    #[serde(default)]
    pub parent_verification_id: Option<VerificationId>,
    /// Set only when `status == Failed`.
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl VerificationRequest {
    /// A fresh top-level request in `Pending`.
    pub fn new(
        verification_type: VerificationType,
        subject_id: SubjectId,
        additional_data: AdditionalData,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: VerificationId::generate(),
            verification_type,
            subject_id,
            additional_data,
            status: VerificationStatus::Pending,
            created_at,
            completed_at: None,
            parent_verification_id: None,
            failure_reason: None,
        }
    }

    /// Link this request to its parent KYB run.
    pub fn with_parent(mut self, parent: VerificationId) -> Self {
        self.parent_verification_id = Some(parent);
        self
    }

    pub fn is_child(&self) -> bool {
        self.parent_verification_id.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, stamping `completed_at` on entry to a terminal state.
    ///
    /// `reason` is recorded only when moving to `Failed`.
    pub fn advance(
        &mut self,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), TypesError> {
        self.status = self.status.transition(next)?;
        if next.is_terminal() {
            self.completed_at = Some(now);
        }
        if next == VerificationStatus::Failed {
            self.failure_reason = reason;
        }
        Ok(())
    }
}
