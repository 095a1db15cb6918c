//! In-process storage backend.
//!
//! Thread-safe for use with tokio's multi-threaded runtime. Each record kind lives in
//! its own `Mutex<HashMap>`; every trait method takes exactly one lock, so a status
//! transition is atomic with respect to concurrent readers and writers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use veriflow_types::{
    CheckResult, EvidenceSnapshot, Timestamp, VerificationId, VerificationReport,
    VerificationRequest, VerificationStatus,
};

use crate::{CheckResultStore, EvidenceStore, ReportStore, StoreError, VerificationStore};

#[derive(Default)]
pub struct MemoryStore {
    requests: Mutex<HashMap<VerificationId, VerificationRequest>>,
    snapshots: Mutex<HashMap<VerificationId, EvidenceSnapshot>>,
    results: Mutex<HashMap<VerificationId, Vec<CheckResult>>>,
    reports: Mutex<HashMap<VerificationId, VerificationReport>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_transition(
        &self,
        id: &VerificationId,
        expected: Option<VerificationStatus>,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<VerificationRequest, StoreError> {
        let mut requests = lock(&self.requests)?;
        let stored = requests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(expected) = expected {
            if stored.status != expected {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    found: stored.status,
                });
            }
        }
        let mut updated = stored.clone();
        updated
            .advance(next, reason, now)
            .map_err(|source| StoreError::InvalidTransition {
                id: id.to_string(),
                source,
            })?;
        *stored = updated.clone();
        Ok(updated)
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    m.lock()
        .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
}

impl VerificationStore for MemoryStore {
    fn create_request(&self, request: &VerificationRequest) -> Result<(), StoreError> {
        let mut requests = lock(&self.requests)?;
        if requests.contains_key(&request.id) {
            return Err(StoreError::Duplicate(request.id.to_string()));
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    fn get_request(&self, id: &VerificationId) -> Result<VerificationRequest, StoreError> {
        lock(&self.requests)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn transition(
        &self,
        id: &VerificationId,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<VerificationRequest, StoreError> {
        self.apply_transition(id, None, next, reason, now)
    }

    fn transition_from(
        &self,
        id: &VerificationId,
        expected: VerificationStatus,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<VerificationRequest, StoreError> {
        self.apply_transition(id, Some(expected), next, reason, now)
    }

    fn children(&self, parent: &VerificationId) -> Result<Vec<VerificationRequest>, StoreError> {
        let mut children: Vec<_> = lock(&self.requests)?
            .values()
            .filter(|r| r.parent_verification_id.as_ref() == Some(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        Ok(children)
    }

    fn request_count(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.requests)?.len() as u64)
    }
}

impl EvidenceStore for MemoryStore {
    fn put_snapshot(&self, snapshot: &EvidenceSnapshot) -> Result<(), StoreError> {
        let mut snapshots = lock(&self.snapshots)?;
        if snapshots.contains_key(&snapshot.verification_id) {
            return Err(StoreError::Duplicate(snapshot.verification_id.to_string()));
        }
        snapshots.insert(snapshot.verification_id.clone(), snapshot.clone());
        Ok(())
    }

    fn get_snapshot(&self, id: &VerificationId) -> Result<EvidenceSnapshot, StoreError> {
        lock(&self.snapshots)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl CheckResultStore for MemoryStore {
    fn append_result(&self, result: &CheckResult) -> Result<(), StoreError> {
        lock(&self.results)?
            .entry(result.verification_id.clone())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    fn results(&self, id: &VerificationId) -> Result<Vec<CheckResult>, StoreError> {
        Ok(lock(&self.results)?.get(id).cloned().unwrap_or_default())
    }
}

impl ReportStore for MemoryStore {
    fn put_report(&self, report: &VerificationReport) -> Result<(), StoreError> {
        let mut reports = lock(&self.reports)?;
        if reports.contains_key(&report.verification_id) {
            return Err(StoreError::Duplicate(report.verification_id.to_string()));
        }
        reports.insert(report.verification_id.clone(), report.clone());
        Ok(())
    }

    fn get_report(&self, id: &VerificationId) -> Result<VerificationReport, StoreError> {
        lock(&self.reports)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn delete_report(&self, id: &VerificationId) -> Result<(), StoreError> {
        lock(&self.reports)?.remove(id);
        Ok(())
    }
}
