//! In-flight workflow table.
//!
//! Shared between intake (which registers new requests), the workflows (which
//! report their phase) and `cancel` (which signals a running workflow).

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::watch;

use veriflow_types::{SubjectId, VerificationId, VerificationRequest, VerificationType};

/// Where a workflow currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Queued,
    Acquiring,
    RunningAgents,
    AwaitingUbos,
    Compiling,
}

/// One row of [`in_flight`](crate::VerificationEngine::in_flight).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InFlight {
    pub verification_id: VerificationId,
    pub parent: Option<VerificationId>,
    pub verification_type: VerificationType,
    pub subject_id: SubjectId,
    pub phase: Phase,
}

struct Entry {
    info: InFlight,
    cancel: watch::Sender<bool>,
}

/// Workflows that are queued or running, keyed by verification id.
pub struct WorkflowRegistry {
    entries: HashMap<VerificationId, Entry>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Track a freshly admitted request. The returned receiver flips to `true`
    /// when the request is cancelled.
    pub fn register(&mut self, request: &VerificationRequest) -> watch::Receiver<bool> {
        let (cancel, rx) = watch::channel(false);
        let info = InFlight {
            verification_id: request.id.clone(),
            parent: request.parent_verification_id.clone(),
            verification_type: request.verification_type,
            subject_id: request.subject_id.clone(),
            phase: Phase::Queued,
        };
        self.entries.insert(request.id.clone(), Entry { info, cancel });
        rx
    }

    pub fn set_phase(&mut self, id: &VerificationId, phase: Phase) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.info.phase = phase;
        }
    }

    /// Signal cancellation. Returns `false` when the id is not in flight.
    pub fn cancel(&self, id: &VerificationId) -> bool {
        match self.entries.get(id) {
            Some(entry) => {
                entry.cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &VerificationId) -> Option<InFlight> {
        self.entries.remove(id).map(|e| e.info)
    }

    pub fn get(&self, id: &VerificationId) -> Option<&InFlight> {
        self.entries.get(id).map(|e| &e.info)
    }

    /// Every in-flight workflow, parents before their children.
    pub fn snapshot(&self) -> Vec<InFlight> {
        let mut rows: Vec<InFlight> = self.entries.values().map(|e| e.info.clone()).collect();
        rows.sort_by(|a, b| {
            (a.parent.is_some(), &a.verification_id).cmp(&(b.parent.is_some(), &b.verification_id))
        });
        rows
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriflow_types::{AdditionalData, Timestamp};

    fn request(subject: &str) -> VerificationRequest {
        VerificationRequest::new(
            VerificationType::Kyc,
            SubjectId::new(subject),
            AdditionalData::new(),
            Timestamp::EPOCH,
        )
    }

    #[test]
    fn register_and_track_phase() {
        let mut registry = WorkflowRegistry::new();
        let req = request("U1");
        let _rx = registry.register(&req);
        assert_eq!(registry.get(&req.id).map(|i| i.phase), Some(Phase::Queued));
        registry.set_phase(&req.id, Phase::RunningAgents);
        assert_eq!(registry.get(&req.id).map(|i| i.phase), Some(Phase::RunningAgents));
        assert!(registry.remove(&req.id).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn cancel_flips_the_watch() {
        let mut registry = WorkflowRegistry::new();
        let req = request("U1");
        let rx = registry.register(&req);
        assert!(!*rx.borrow());
        assert!(registry.cancel(&req.id));
        assert!(*rx.borrow());
        assert!(!registry.cancel(&VerificationId::generate()));
    }

    #[test]
    fn snapshot_lists_parents_first() {
        let mut registry = WorkflowRegistry::new();
        let parent = request("B1");
        let child = request("P1").with_parent(parent.id.clone());
        let _c = registry.register(&child);
        let _p = registry.register(&parent);
        let rows = registry.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].verification_id, parent.id);
        assert_eq!(rows[1].parent.as_ref(), Some(&parent.id));
    }
}
