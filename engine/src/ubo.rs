//! UBO sub-verification: one child KYC run per beneficial owner.
//!
//! Children are admitted on the sub-verification lane before the parent's agents
//! start, and joined after the parent's own barrier. The join reads each
//! child's final record from the store, so a child that failed (or was shut
//! down) still yields a reference.

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn, Instrument};

use veriflow_store::RecordStore;
use veriflow_types::{
    AdditionalData, BeneficialOwner, Clock, OverallStatus, UboReference, VerificationRequest,
    VerificationStatus, VerificationType,
};

use crate::dispatch::{Admission, Job};
use crate::tracing_spans;
use crate::EngineError;

/// A child that has been admitted and not yet joined.
pub struct PendingChild {
    pub request: VerificationRequest,
    pub role: Option<String>,
    done: oneshot::Receiver<VerificationStatus>,
}

pub struct UboCoordinator {
    store: Arc<dyn RecordStore>,
    admission: Arc<Admission>,
    lane: mpsc::Sender<Job>,
    clock: Arc<dyn Clock>,
}

impl UboCoordinator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        admission: Arc<Admission>,
        lane: mpsc::Sender<Job>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            admission,
            lane,
            clock,
        }
    }

    /// Admit one child per owner.
    pub async fn spawn_children(
        &self,
        parent: &VerificationRequest,
        owners: &[BeneficialOwner],
    ) -> Result<Vec<PendingChild>, EngineError> {
        let mut children = Vec::with_capacity(owners.len());
        for owner in owners {
            let request = VerificationRequest::new(
                VerificationType::Kyc,
                owner.owner_id.clone(),
                child_data(parent, owner),
                self.clock.now(),
            )
            .with_parent(parent.id.clone());
            let (tx, done) = oneshot::channel();
            let pending = PendingChild {
                request: request.clone(),
                role: owner.role.clone(),
                done,
            };
            match self.admission.admit(request, &self.lane, Some(tx)).await {
                Ok(()) => {}
                // The child is already recorded as failed; the join will report it.
                Err(EngineError::ShuttingDown) => {
                    warn!(owner = %owner.owner_id, "sub-verification lane closed")
                }
                Err(e) => return Err(e),
            }
            debug!(child = %pending.request.id, owner = %owner.owner_id, "ubo child admitted");
            children.push(pending);
        }
        Ok(children)
    }

    /// Wait for every child to settle and build the parent's references.
    pub async fn join(&self, children: Vec<PendingChild>) -> Result<Vec<UboReference>, EngineError> {
        if children.is_empty() {
            return Ok(Vec::new());
        }
        let span = tracing_spans::ubo_join_span(children.len());
        async {
            let (meta, waits): (Vec<_>, Vec<_>) = children
                .into_iter()
                .map(|c| ((c.request, c.role), c.done))
                .unzip();
            // A dropped sender means the child was retired without a handle;
            // the stored record is authoritative either way.
            let _ = join_all(waits).await;

            meta.into_iter()
                .map(|(request, role)| self.reference(request, role))
                .collect::<Result<Vec<_>, _>>()
        }
        .instrument(span)
        .await
    }

    fn reference(
        &self,
        child: VerificationRequest,
        role: Option<String>,
    ) -> Result<UboReference, EngineError> {
        let stored = self.store.get_request(&child.id)?;
        let result: Option<OverallStatus> = match stored.status {
            VerificationStatus::Completed => Some(self.store.get_report(&child.id)?.overall_status),
            _ => None,
        };
        Ok(UboReference {
            verification_id: stored.id,
            user_id: stored.subject_id,
            status: stored.status,
            result,
            reason: stored.failure_reason,
            role,
        })
    }
}

fn child_data(parent: &VerificationRequest, owner: &BeneficialOwner) -> AdditionalData {
    let mut data = AdditionalData::new();
    data.insert("parent_subject_id".into(), json!(parent.subject_id));
    if let Some(role) = &owner.role {
        data.insert("ubo_role".into(), json!(role));
    }
    if let Some(pct) = owner.ownership_percentage {
        data.insert("ownership_percentage".into(), json!(pct));
    }
    data
}
