//! End-to-end tests: intake → acquisition → agents → UBO children → report.
//!
//! Every collaborator is a nullable double, so these tests wire together the
//! same components the daemon does, minus the network.

use std::sync::Arc;
use std::time::Duration;

use veriflow_engine::{
    EngineConfig, EngineError, Phase, ReportStatus, RetryConfig, VerificationEngine,
};
use veriflow_integrations::RecordCategory;
use veriflow_nullables::{fixtures, NullClock, NullCollaborators, NullFraudScorer, NullSummarizer};
use veriflow_store::{
    CheckResultStore, EvidenceStore, MemoryStore, ReportStore, VerificationStore,
};
use veriflow_types::{
    AdditionalData, AgentKind, OverallStatus, VerificationId, VerificationRequest,
    VerificationStatus, VerificationType,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SETTLE: Duration = Duration::from_secs(10);
const POLL: Duration = Duration::from_millis(5);

fn config() -> EngineConfig {
    EngineConfig {
        worker_capacity: 4,
        queue_capacity: 16,
        sub_capacity: 4,
        agent_timeout_ms: 2_000,
        workflow_timeout_ms: 10_000,
        retry: RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        },
        ..EngineConfig::default()
    }
}

struct Harness {
    engine: Arc<VerificationEngine>,
    store: Arc<MemoryStore>,
}

async fn harness(nulls: &NullCollaborators, config: EngineConfig) -> Harness {
    veriflow_utils::init_tracing();
    let store = Arc::new(MemoryStore::new());
    let engine = VerificationEngine::new(
        config,
        nulls.integrations(),
        store.clone(),
        Arc::new(NullClock::new(fixtures::AS_OF)),
    )
    .expect("engine");
    engine.start().await.expect("start");
    Harness {
        engine: Arc::new(engine),
        store,
    }
}

impl Harness {
    async fn verify(&self, vt: VerificationType, subject: &str) -> VerificationId {
        self.engine
            .start_verification(vt, subject, AdditionalData::new())
            .await
            .expect("intake")
    }

    async fn settle(&self, id: &VerificationId) -> VerificationRequest {
        tokio::time::timeout(SETTLE, self.engine.wait_for_terminal(id, POLL))
            .await
            .expect("settled in time")
            .expect("readable")
    }

    async fn wait_for_phase(&self, id: &VerificationId, phase: Phase) {
        tokio::time::timeout(SETTLE, async {
            loop {
                let rows = self.engine.in_flight().await;
                if rows
                    .iter()
                    .any(|r| &r.verification_id == id && r.phase == phase)
                {
                    return;
                }
                tokio::time::sleep(POLL).await;
            }
        })
        .await
        .expect("phase reached in time");
    }

    /// The store settles before the registry row is dropped.
    async fn wait_idle(&self) {
        tokio::time::timeout(SETTLE, async {
            while !self.engine.in_flight().await.is_empty() {
                tokio::time::sleep(POLL).await;
            }
        })
        .await
        .expect("idle in time");
    }

    fn report(&self, id: &VerificationId) -> veriflow_types::VerificationReport {
        match self.engine.get_report(id).expect("get_report") {
            ReportStatus::Ready(report) => report,
            other => panic!("expected a report, got {other:?}"),
        }
    }
}

fn failing_signal(nulls: &NullCollaborators, subject: &str, check: &str) {
    nulls.passing_subject(subject, fixtures::DEFAULT_NAME);
    let reference = fixtures::inquiry_reference(subject);
    let mut signals = fixtures::id_signals(&reference, fixtures::DEFAULT_NAME);
    fixtures::fail_signal(&mut signals, check);
    nulls.identity.register(&reference, signals);
}

// ---------------------------------------------------------------------------
// KYC
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kyc_all_pass_is_passed() {
    let nulls = NullCollaborators::new();
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    let request = h.settle(&id).await;
    assert_eq!(request.status, VerificationStatus::Completed);
    assert!(request.completed_at.is_some());

    let report = h.report(&id);
    assert_eq!(report.overall_status, OverallStatus::Passed);
    assert_eq!(report.results.len(), 10);
    assert_eq!(report.tally.passed, 10);
    assert_eq!(h.store.results(&id).unwrap().len(), 10);
    assert!(h.store.get_snapshot(&id).is_ok());

    // Reporting is idempotent once completed.
    assert_eq!(h.engine.get_report(&id).unwrap(), ReportStatus::Ready(report));
    h.wait_idle().await;
    assert_eq!(h.engine.metrics().verifications_completed.get(), 1);
    assert_eq!(h.engine.metrics().in_flight.get(), 0);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn govt_id_failure_fails_the_verification() {
    let nulls = NullCollaborators::new();
    failing_signal(&nulls, "U2", "id_tamper_detection");
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U2").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);

    let report = h.report(&id);
    assert_eq!(report.overall_status, OverallStatus::Failed);
    let govt = report
        .results
        .iter()
        .find(|r| r.agent_type == AgentKind::GovtId)
        .unwrap();
    assert_eq!(govt.status, veriflow_types::CheckStatus::Failed);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn data_source_outage_fails_without_report() {
    let nulls = NullCollaborators::new();
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    nulls.data_source.set_outage(true);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    let request = h.settle(&id).await;
    assert_eq!(request.status, VerificationStatus::Failed);
    assert_eq!(request.failure_reason.as_deref(), Some("acquisition_unavailable"));
    assert_eq!(
        h.engine.get_report(&id).unwrap(),
        ReportStatus::Failed("acquisition_unavailable".into())
    );
    assert!(h.store.get_report(&id).unwrap_err().is_not_found());
    assert!(h.store.results(&id).unwrap().is_empty());
    h.engine.shutdown().await;
}

#[tokio::test]
async fn unknown_subject_is_not_found() {
    let nulls = NullCollaborators::new();
    let h = harness(&nulls, config()).await;
    let id = h.verify(VerificationType::Kyc, "ghost").await;
    let request = h.settle(&id).await;
    assert_eq!(request.failure_reason.as_deref(), Some("acquisition_not_found"));
    h.engine.shutdown().await;
}

#[tokio::test]
async fn hanging_agent_times_out_and_run_completes() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let h = harness(
        &nulls,
        EngineConfig {
            agent_timeout_ms: 100,
            ..config()
        },
    )
    .await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);
    let report = h.report(&id);
    let fraud = report
        .results
        .iter()
        .find(|r| r.agent_type == AgentKind::FraudScore)
        .unwrap();
    assert_eq!(fraud.error_kind(), Some("timeout"));
    assert_eq!(report.results.len(), 10);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn workflow_ceiling_fails_the_run() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let h = harness(
        &nulls,
        EngineConfig {
            agent_timeout_ms: 5_000,
            workflow_timeout_ms: 100,
            ..config()
        },
    )
    .await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    let request = h.settle(&id).await;
    assert_eq!(request.failure_reason.as_deref(), Some("workflow_timeout"));
    assert!(h.store.get_report(&id).unwrap_err().is_not_found());
    h.engine.shutdown().await;
}

#[tokio::test]
async fn summary_service_text_lands_in_report() {
    let nulls = NullCollaborators::new().with_summarizer(NullSummarizer::new());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    h.settle(&id).await;
    assert_eq!(
        h.report(&id).summary,
        "Reviewed 10 checks and 0 beneficial owners."
    );
    h.engine.shutdown().await;
}

// ---------------------------------------------------------------------------
// KYB and UBO children
// ---------------------------------------------------------------------------

#[tokio::test]
async fn kyb_with_one_failing_owner_is_failed() {
    let nulls = NullCollaborators::new();
    nulls.business("B1", fixtures::DEFAULT_BUSINESS, &["P1", "P2"]);
    nulls.passing_subject("P1", fixtures::DEFAULT_NAME);
    failing_signal(&nulls, "P2", "watchlist_ofac_detection");
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyb, "B1").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);

    let report = h.report(&id);
    assert_eq!(report.overall_status, OverallStatus::Failed);
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.ubo_references.len(), 2);

    let children = h.store.children(&id).unwrap();
    assert_eq!(children.len(), 2);
    for child in &children {
        assert_eq!(child.parent_verification_id.as_ref(), Some(&id));
        assert_eq!(child.verification_type, VerificationType::Kyc);
        assert_eq!(child.additional_data["parent_subject_id"], "B1");
    }

    let by_owner = |owner: &str| {
        report
            .ubo_references
            .iter()
            .find(|u| u.user_id.as_str() == owner)
            .unwrap()
    };
    assert_eq!(by_owner("P1").result, Some(OverallStatus::Passed));
    assert_eq!(by_owner("P1").role.as_deref(), Some("director"));
    assert_eq!(by_owner("P2").result, Some(OverallStatus::Failed));
    h.engine.shutdown().await;
}

#[tokio::test]
async fn owner_without_data_is_a_failed_reference() {
    let nulls = NullCollaborators::new();
    nulls.business("B2", fixtures::DEFAULT_BUSINESS, &["P1", "P9"]);
    nulls.passing_subject("P1", fixtures::DEFAULT_NAME);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyb, "B2").await;
    h.settle(&id).await;
    let report = h.report(&id);
    let missing = report
        .ubo_references
        .iter()
        .find(|u| u.user_id.as_str() == "P9")
        .unwrap();
    assert_eq!(missing.status, VerificationStatus::Failed);
    assert_eq!(missing.result, None);
    assert_eq!(missing.reason.as_deref(), Some("acquisition_not_found"));
    // The parent's own results are untouched by the failed child.
    assert_eq!(report.results.len(), 5);
    assert_eq!(report.overall_status, OverallStatus::Failed);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn advisory_shareholders_only_warn() {
    let nulls = NullCollaborators::new();
    nulls.business("B3", fixtures::DEFAULT_BUSINESS, &["P1", "P2"]);
    nulls.passing_subject("P1", fixtures::DEFAULT_NAME);
    failing_signal(&nulls, "P2", "watchlist_ofac_detection");
    let mut cfg = config();
    cfg.policy.ubo.by_role.insert(
        "shareholder".into(),
        veriflow_agents::Requirement::Advisory,
    );
    let h = harness(&nulls, cfg).await;

    let id = h.verify(VerificationType::Kyb, "B3").await;
    h.settle(&id).await;
    assert_eq!(h.report(&id).overall_status, OverallStatus::Warning);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn kyb_without_owners_has_no_children() {
    let nulls = NullCollaborators::new();
    nulls.business("B4", fixtures::DEFAULT_BUSINESS, &[]);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyb, "B4").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);
    let report = h.report(&id);
    assert!(report.ubo_references.is_empty());
    assert!(h.store.children(&id).unwrap().is_empty());
    h.engine.shutdown().await;
}

#[tokio::test]
async fn in_flight_shows_parent_and_children() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    nulls.business("B1", fixtures::DEFAULT_BUSINESS, &["P1", "P2"]);
    nulls.passing_subject("P1", fixtures::DEFAULT_NAME);
    nulls.passing_subject("P2", fixtures::DEFAULT_NAME);
    let h = harness(
        &nulls,
        EngineConfig {
            agent_timeout_ms: 30_000,
            ..config()
        },
    )
    .await;

    let id = h.verify(VerificationType::Kyb, "B1").await;
    h.wait_for_phase(&id, Phase::AwaitingUbos).await;

    let rows = h.engine.in_flight().await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].verification_id, id);
    assert!(rows[1..].iter().all(|r| r.parent.as_ref() == Some(&id)));
    // The parent reports as in progress while its children run.
    assert_eq!(
        h.engine.get_report(&id).unwrap(),
        ReportStatus::InProgress(VerificationStatus::Processing)
    );

    h.engine.shutdown().await;
    let request = h.store.get_request(&id).unwrap();
    assert_eq!(request.failure_reason.as_deref(), Some("shutdown"));
    for child in h.store.children(&id).unwrap() {
        assert_eq!(child.status, VerificationStatus::Failed);
    }
}

// ---------------------------------------------------------------------------
// Cancellation, backpressure, shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_running_verification() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let h = harness(
        &nulls,
        EngineConfig {
            agent_timeout_ms: 30_000,
            ..config()
        },
    )
    .await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    h.wait_for_phase(&id, Phase::RunningAgents).await;
    assert!(h.engine.cancel(&id).await.unwrap());

    let request = h.settle(&id).await;
    assert_eq!(request.failure_reason.as_deref(), Some("cancelled"));
    assert_eq!(
        h.engine.get_report(&id).unwrap(),
        ReportStatus::Failed("cancelled".into())
    );
    // Settled requests cannot be cancelled again.
    assert!(!h.engine.cancel(&id).await.unwrap());
    h.engine.shutdown().await;
}

#[tokio::test]
async fn cancel_queued_verification_fails_immediately() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    nulls.passing_subject("U2", fixtures::DEFAULT_NAME);
    let h = harness(
        &nulls,
        EngineConfig {
            worker_capacity: 1,
            agent_timeout_ms: 30_000,
            ..config()
        },
    )
    .await;

    let first = h.verify(VerificationType::Kyc, "U1").await;
    h.wait_for_phase(&first, Phase::RunningAgents).await;
    let second = h.verify(VerificationType::Kyc, "U2").await;

    assert!(h.engine.cancel(&second).await.unwrap());
    let request = h.store.get_request(&second).unwrap();
    assert_eq!(request.status, VerificationStatus::Failed);
    assert_eq!(request.failure_reason.as_deref(), Some("cancelled"));

    h.engine.cancel(&first).await.unwrap();
    h.settle(&first).await;
    h.engine.shutdown().await;
}

#[tokio::test]
async fn full_queue_makes_intake_wait() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    for subject in ["U1", "U2", "U3", "U4"] {
        nulls.passing_subject(subject, fixtures::DEFAULT_NAME);
    }
    let h = harness(
        &nulls,
        EngineConfig {
            worker_capacity: 1,
            queue_capacity: 1,
            agent_timeout_ms: 30_000,
            ..config()
        },
    )
    .await;

    // One running, one held by the dispatcher, one queued.
    let first = h.verify(VerificationType::Kyc, "U1").await;
    h.wait_for_phase(&first, Phase::RunningAgents).await;
    h.verify(VerificationType::Kyc, "U2").await;
    h.verify(VerificationType::Kyc, "U3").await;

    let engine = h.engine.clone();
    let blocked = tokio::spawn(async move {
        engine
            .start_verification(VerificationType::Kyc, "U4", AdditionalData::new())
            .await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!blocked.is_finished(), "intake should wait for queue space");

    // Freeing the worker lets the queue advance.
    h.engine.cancel(&first).await.unwrap();
    let fourth = tokio::time::timeout(SETTLE, blocked)
        .await
        .expect("intake resumed")
        .expect("task")
        .expect("accepted");
    assert!(h.store.get_request(&fourth).is_ok());
    h.engine.shutdown().await;
}

#[tokio::test]
async fn shutdown_fails_queued_and_running_work() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    nulls.passing_subject("U2", fixtures::DEFAULT_NAME);
    let h = harness(
        &nulls,
        EngineConfig {
            worker_capacity: 1,
            agent_timeout_ms: 30_000,
            ..config()
        },
    )
    .await;

    let running = h.verify(VerificationType::Kyc, "U1").await;
    h.wait_for_phase(&running, Phase::RunningAgents).await;
    let queued = h.verify(VerificationType::Kyc, "U2").await;

    h.engine.shutdown().await;
    for id in [&running, &queued] {
        let request = h.store.get_request(id).unwrap();
        assert_eq!(request.status, VerificationStatus::Failed);
        assert_eq!(request.failure_reason.as_deref(), Some("shutdown"));
    }
    assert!(h.engine.in_flight().await.is_empty());
    assert!(matches!(
        h.engine
            .start_verification(VerificationType::Kyc, "U1", AdditionalData::new())
            .await,
        Err(EngineError::ShuttingDown)
    ));
}

// ---------------------------------------------------------------------------
// Intake and reporting edges
// ---------------------------------------------------------------------------

#[tokio::test]
async fn intake_rejects_bad_subjects_and_unknown_ids() {
    let nulls = NullCollaborators::new();
    let h = harness(&nulls, config()).await;

    assert!(matches!(
        h.engine
            .start_verification(VerificationType::Kyc, "  U1 ", AdditionalData::new())
            .await,
        Err(EngineError::InvalidSubject(_))
    ));
    assert_eq!(
        h.engine.get_report(&VerificationId::generate()).unwrap(),
        ReportStatus::NotFound
    );
    assert!(matches!(
        h.engine.cancel(&VerificationId::generate()).await,
        Err(EngineError::NotFound(_))
    ));
    assert!(matches!(h.engine.start().await, Err(EngineError::AlreadyStarted)));
    assert_eq!(h.store.request_count().unwrap(), 0);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn intake_before_start_is_refused() {
    let nulls = NullCollaborators::new();
    let engine = VerificationEngine::new(
        config(),
        nulls.integrations(),
        Arc::new(MemoryStore::new()),
        Arc::new(NullClock::new(fixtures::AS_OF)),
    )
    .unwrap();
    assert!(matches!(
        engine
            .start_verification(VerificationType::Kyc, "U1", AdditionalData::new())
            .await,
        Err(EngineError::NotStarted)
    ));
}

#[tokio::test]
async fn flaky_source_recovers_within_retry_budget() {
    let nulls = NullCollaborators::new();
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    nulls.data_source.fail_next(1);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn broken_inquiry_lookup_still_completes() {
    let nulls = NullCollaborators::new();
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    nulls.data_source.fail(
        "U1",
        RecordCategory::InquiryReference,
        veriflow_integrations::ExternalError::Permanent("gone".into()),
    );
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);
    let snapshot = h.store.get_snapshot(&id).unwrap();
    assert!(!snapshot.has(veriflow_types::evidence::doc::ID_CHECK));
    h.engine.shutdown().await;
}

#[tokio::test]
async fn scorer_blip_is_retried_and_verdict_passes() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::new(10.0).failing_first(1));
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);
    assert_eq!(h.report(&id).overall_status, OverallStatus::Passed);
    assert_eq!(nulls.fraud.calls(), 2);
    h.engine.shutdown().await;
}

#[tokio::test]
async fn scorer_down_past_retry_budget_fails_fraud_check() {
    let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::unavailable());
    nulls.passing_subject("U1", fixtures::DEFAULT_NAME);
    let h = harness(&nulls, config()).await;

    let id = h.verify(VerificationType::Kyc, "U1").await;
    assert_eq!(h.settle(&id).await.status, VerificationStatus::Completed);
    let report = h.report(&id);
    let fraud = report
        .results
        .iter()
        .find(|r| r.agent_type == AgentKind::FraudScore)
        .expect("fraud result");
    assert_eq!(fraud.error_kind(), Some("agent_error"));
    assert_eq!(report.overall_status, OverallStatus::Failed);
    assert_eq!(nulls.fraud.calls(), config().retry.max_attempts as usize);
    h.engine.shutdown().await;
}
