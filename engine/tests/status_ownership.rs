//! Only one task writes a request's status at a time.
//!
//! The store below lets a test land a second writer exactly between a reader's
//! check and its write, which is otherwise a timing accident.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use veriflow_engine::{EngineConfig, Phase, ReportStatus, RetryConfig, VerificationEngine};
use veriflow_nullables::{fixtures, NullClock, NullCollaborators, NullFraudScorer};
use veriflow_store::{
    CheckResultStore, EvidenceStore, MemoryStore, ReportStore, StoreError, VerificationStore,
};
use veriflow_types::{
    AdditionalData, CheckResult, EvidenceSnapshot, Timestamp, VerificationId, VerificationReport,
    VerificationRequest, VerificationStatus, VerificationType,
};

const SETTLE: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(5);

/// `MemoryStore` with two scripted interleavings.
#[derive(Default)]
struct InterleavingStore {
    inner: MemoryStore,
    /// The next read of this id hands back the stored copy, then moves the record
    /// to `processing` as a worker picking it up would.
    pickup_after_read: Mutex<Option<VerificationId>>,
    /// The next report write is preceded by a foreign `failed` write.
    fail_before_report: AtomicBool,
}

impl VerificationStore for InterleavingStore {
    fn create_request(&self, request: &VerificationRequest) -> Result<(), StoreError> {
        self.inner.create_request(request)
    }

    fn get_request(&self, id: &VerificationId) -> Result<VerificationRequest, StoreError> {
        let read = self.inner.get_request(id)?;
        let armed = {
            let mut slot = self.pickup_after_read.lock().unwrap();
            if slot.as_ref() == Some(id) {
                slot.take()
            } else {
                None
            }
        };
        if armed.is_some() {
            self.inner
                .transition(id, VerificationStatus::Processing, None, Timestamp::new(fixtures::AS_OF))?;
        }
        Ok(read)
    }

    fn transition(
        &self,
        id: &VerificationId,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<VerificationRequest, StoreError> {
        self.inner.transition(id, next, reason, now)
    }

    fn transition_from(
        &self,
        id: &VerificationId,
        expected: VerificationStatus,
        next: VerificationStatus,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<VerificationRequest, StoreError> {
        self.inner.transition_from(id, expected, next, reason, now)
    }

    fn children(&self, parent: &VerificationId) -> Result<Vec<VerificationRequest>, StoreError> {
        self.inner.children(parent)
    }

    fn request_count(&self) -> Result<u64, StoreError> {
        self.inner.request_count()
    }
}

impl EvidenceStore for InterleavingStore {
    fn put_snapshot(&self, snapshot: &EvidenceSnapshot) -> Result<(), StoreError> {
        self.inner.put_snapshot(snapshot)
    }

    fn get_snapshot(&self, id: &VerificationId) -> Result<EvidenceSnapshot, StoreError> {
        self.inner.get_snapshot(id)
    }
}

impl CheckResultStore for InterleavingStore {
    fn append_result(&self, result: &CheckResult) -> Result<(), StoreError> {
        self.inner.append_result(result)
    }

    fn results(&self, id: &VerificationId) -> Result<Vec<CheckResult>, StoreError> {
        self.inner.results(id)
    }
}

impl ReportStore for InterleavingStore {
    fn put_report(&self, report: &VerificationReport) -> Result<(), StoreError> {
        if self.fail_before_report.swap(false, Ordering::SeqCst) {
            self.inner.transition(
                &report.verification_id,
                VerificationStatus::Failed,
                Some("overridden".into()),
                Timestamp::new(fixtures::AS_OF),
            )?;
        }
        self.inner.put_report(report)
    }

    fn get_report(&self, id: &VerificationId) -> Result<VerificationReport, StoreError> {
        self.inner.get_report(id)
    }

    fn delete_report(&self, id: &VerificationId) -> Result<(), StoreError> {
        self.inner.delete_report(id)
    }
}

fn config() -> EngineConfig {
    EngineConfig {
        worker_capacity: 1,
        queue_capacity: 4,
        agent_timeout_ms: 30_000,
        retry: RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        },
        ..EngineConfig::default()
    }
}

async fn engine(nulls: &NullCollaborators, store: Arc<InterleavingStore>) -> VerificationEngine {
    let engine = VerificationEngine::new(
        config(),
        nulls.integrations(),
        store,
        Arc::new(NullClock::new(fixtures::AS_OF)),
    )
    .expect("engine");
    engine.start().await.expect("start");
    engine
}

async fn wait_for_phase(engine: &VerificationEngine, id: &VerificationId, phase: Phase) {
    tokio::time::timeout(SETTLE, async {
        loop {
            let rows = engine.in_flight().await;
            if rows.iter().any(|r| &r.verification_id == id && r.phase == phase) {
                return;
            }
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("phase reached in time");
}

#[tokio::test]
async fn cancel_does_not_overwrite_a_request_picked_up_after_its_read() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    nulls.passing_subject("U2", fixtures::DEFAULT_NAME);
    let store = Arc::new(InterleavingStore::default());
    let engine = engine(&nulls, store.clone()).await;

    // U1 holds the only worker, so U2 stays queued.
    let busy = engine
        .start_verification(VerificationType::Kyc, "U1", AdditionalData::new())
        .await
        .unwrap();
    wait_for_phase(&engine, &busy, Phase::RunningAgents).await;
    let queued = engine
        .start_verification(VerificationType::Kyc, "U2", AdditionalData::new())
        .await
        .unwrap();

    *store.pickup_after_read.lock().unwrap() = Some(queued.clone());
    assert!(engine.cancel(&queued).await.unwrap());

    let request = store.get_request(&queued).unwrap();
    assert_eq!(request.status, VerificationStatus::Processing);
    assert_eq!(request.failure_reason, None);

    engine.shutdown().await;
}

#[tokio::test]
async fn report_is_withdrawn_when_completion_loses_the_record() {
    let nulls = NullCollaborators::new();
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let store = Arc::new(InterleavingStore::default());
    store.fail_before_report.store(true, Ordering::SeqCst);
    let engine = engine(&nulls, store.clone()).await;

    let id = engine
        .start_verification(VerificationType::Kyc, "U1", AdditionalData::new())
        .await
        .unwrap();
    let request = tokio::time::timeout(SETTLE, engine.wait_for_terminal(&id, POLL))
        .await
        .expect("settled in time")
        .unwrap();

    assert_eq!(request.status, VerificationStatus::Failed);
    assert_eq!(request.failure_reason.as_deref(), Some("overridden"));
    // Give the runner time to finish settling after the foreign write.
    tokio::time::timeout(SETTLE, async {
        while !engine.in_flight().await.is_empty() {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("idle in time");
    assert!(store.get_report(&id).unwrap_err().is_not_found());
    assert_eq!(
        engine.get_report(&id).unwrap(),
        ReportStatus::Failed("overridden".into())
    );

    engine.shutdown().await;
}
