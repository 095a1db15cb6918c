//! Agent fan-out and barrier.
//!
//! Every rostered agent runs in its own task under a per-agent ceiling; the
//! barrier returns once each has produced a result. Errors, panics and timeouts
//! all become failed results, so one bad agent never takes its siblings down.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn, Instrument};

use veriflow_agents::{roster, AgentContext};
use veriflow_integrations::{Integrations, RetryPolicy};
use veriflow_store::RecordStore;
use veriflow_types::{AgentKind, CheckResult, Clock, EvidenceSnapshot, VerificationRequest};

use crate::metrics::EngineMetrics;
use crate::tracing_spans;
use crate::EngineError;

enum Fault {
    Timeout,
    Panic(String),
}

pub struct Scheduler {
    integrations: Arc<Integrations>,
    store: Arc<dyn RecordStore>,
    metrics: Arc<EngineMetrics>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    agent_timeout: Duration,
    max_concurrency: usize,
}

impl Scheduler {
    pub fn new(
        integrations: Arc<Integrations>,
        store: Arc<dyn RecordStore>,
        metrics: Arc<EngineMetrics>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        agent_timeout: Duration,
        max_concurrency: usize,
    ) -> Self {
        Self {
            integrations,
            store,
            metrics,
            clock,
            retry,
            agent_timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Run every agent registered for the request's type over `evidence`.
    pub async fn run(
        &self,
        request: &VerificationRequest,
        evidence: Arc<EvidenceSnapshot>,
    ) -> Result<Vec<CheckResult>, EngineError> {
        let clock = self.clock.clone();
        self.fan_out(request, evidence, roster(request.verification_type), move |kind, ctx| {
            let clock = clock.clone();
            async move { veriflow_agents::evaluate(kind, &ctx, clock.as_ref()).await }
        })
        .await
    }

    async fn fan_out<F, Fut>(
        &self,
        request: &VerificationRequest,
        evidence: Arc<EvidenceSnapshot>,
        kinds: &[AgentKind],
        evaluate: F,
    ) -> Result<Vec<CheckResult>, EngineError>
    where
        F: Fn(AgentKind, AgentContext) -> Fut,
        Fut: Future<Output = CheckResult> + Send + 'static,
    {
        let ctx = AgentContext::new(
            request.id.clone(),
            request.subject_id.clone(),
            evidence,
            self.integrations.clone(),
            self.retry,
        );
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let ceiling = self.agent_timeout;
        let mut tasks = JoinSet::new();

        for &kind in kinds {
            let run = evaluate(kind, ctx.clone());
            let permits = permits.clone();
            tasks.spawn(
                async move {
                    let _permit = permits.acquire_owned().await.ok();
                    let outcome =
                        tokio::time::timeout(ceiling, AssertUnwindSafe(run).catch_unwind()).await;
                    let outcome = match outcome {
                        Ok(Ok(result)) => Ok(result),
                        Ok(Err(panic)) => Err(Fault::Panic(panic_message(panic.as_ref()))),
                        Err(_) => Err(Fault::Timeout),
                    };
                    (kind, outcome)
                }
                .instrument(tracing_spans::agent_span(kind)),
            );
        }

        let mut results = Vec::with_capacity(kinds.len());
        while let Some(joined) = tasks.join_next().await {
            let (kind, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!(verification_id = %request.id, error = %e, "agent task lost");
                    continue;
                }
            };
            let result = match outcome {
                Ok(result) => {
                    if result.error_kind().is_some() {
                        self.metrics.agent_failures.with_label_values(&[kind.as_str()]).inc();
                    }
                    result
                }
                Err(Fault::Timeout) => {
                    warn!(verification_id = %request.id, agent = %kind, ?ceiling, "agent timed out");
                    self.metrics.agent_timeouts.with_label_values(&[kind.as_str()]).inc();
                    CheckResult::failure(
                        request.id.clone(),
                        kind,
                        "timeout",
                        format!("agent exceeded its {} ms limit", ceiling.as_millis()),
                        self.clock.now(),
                    )
                }
                Err(Fault::Panic(message)) => {
                    error!(verification_id = %request.id, agent = %kind, %message, "agent panicked");
                    self.metrics.agent_failures.with_label_values(&[kind.as_str()]).inc();
                    CheckResult::failure(request.id.clone(), kind, "panic", message, self.clock.now())
                }
            };
            self.store.append_result(&result)?;
            results.push(result);
        }

        // A task lost to the runtime still owes a result.
        for &kind in kinds {
            if !results.iter().any(|r| r.agent_type == kind) {
                let result = CheckResult::failure(
                    request.id.clone(),
                    kind,
                    "agent_error",
                    "agent task did not report",
                    self.clock.now(),
                );
                self.store.append_result(&result)?;
                results.push(result);
            }
        }
        Ok(results)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "agent panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veriflow_nullables::{fixtures, NullClock, NullCollaborators, NullFraudScorer};
    use veriflow_store::{CheckResultStore, MemoryStore};
    use veriflow_types::{AdditionalData, CheckStatus, SubjectId, Timestamp, VerificationType};

    struct Rig {
        scheduler: Scheduler,
        store: Arc<MemoryStore>,
        metrics: Arc<EngineMetrics>,
    }

    fn rig(nulls: NullCollaborators, agent_timeout: Duration) -> Rig {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(EngineMetrics::new().unwrap());
        let scheduler = Scheduler::new(
            Arc::new(nulls.integrations()),
            store.clone(),
            metrics.clone(),
            Arc::new(NullClock::new(fixtures::AS_OF)),
            RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(4),
            },
            agent_timeout,
            4,
        );
        Rig {
            scheduler,
            store,
            metrics,
        }
    }

    fn kyc_request() -> (VerificationRequest, Arc<EvidenceSnapshot>) {
        let req = VerificationRequest::new(
            VerificationType::Kyc,
            SubjectId::new("U1"),
            AdditionalData::new(),
            Timestamp::new(fixtures::AS_OF),
        );
        let snap = fixtures::kyc_snapshot(req.id.clone(), fixtures::DEFAULT_NAME);
        (req, Arc::new(snap))
    }

    #[tokio::test]
    async fn one_result_per_agent() {
        let rig = rig(NullCollaborators::new(), Duration::from_secs(5));
        let (req, snap) = kyc_request();
        let results = rig.scheduler.run(&req, snap).await.unwrap();
        assert_eq!(results.len(), roster(VerificationType::Kyc).len());
        assert!(results.iter().all(|r| r.status == CheckStatus::Passed));
        assert_eq!(rig.store.results(&req.id).unwrap().len(), results.len());
    }

    #[tokio::test]
    async fn hanging_agent_times_out_alone() {
        let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::hanging());
        let rig = rig(nulls, Duration::from_millis(50));
        let (req, snap) = kyc_request();
        let results = rig.scheduler.run(&req, snap).await.unwrap();

        let fraud = results
            .iter()
            .find(|r| r.agent_type == AgentKind::FraudScore)
            .unwrap();
        assert_eq!(fraud.status, CheckStatus::Failed);
        assert_eq!(fraud.error_kind(), Some("timeout"));
        assert!(results
            .iter()
            .filter(|r| r.agent_type != AgentKind::FraudScore)
            .all(|r| r.status == CheckStatus::Passed));
        assert_eq!(
            rig.metrics
                .agent_timeouts
                .with_label_values(&["fraud_score"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn transient_scorer_failure_is_retried_inside_the_agent() {
        let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::new(10.0).failing_first(1));
        let scorer = nulls.fraud.clone();
        let rig = rig(nulls, Duration::from_secs(5));
        let (req, snap) = kyc_request();
        let results = rig.scheduler.run(&req, snap).await.unwrap();

        let fraud = results
            .iter()
            .find(|r| r.agent_type == AgentKind::FraudScore)
            .unwrap();
        assert_eq!(fraud.status, CheckStatus::Passed);
        assert_eq!(scorer.calls(), 2);
        assert_eq!(
            rig.metrics.agent_failures.with_label_values(&["fraud_score"]).get(),
            0
        );
    }

    #[tokio::test]
    async fn exhausted_scorer_retries_become_agent_error() {
        let nulls = NullCollaborators::new().with_fraud(NullFraudScorer::unavailable());
        let scorer = nulls.fraud.clone();
        let rig = rig(nulls, Duration::from_secs(5));
        let (req, snap) = kyc_request();
        let results = rig.scheduler.run(&req, snap).await.unwrap();

        let fraud = results
            .iter()
            .find(|r| r.agent_type == AgentKind::FraudScore)
            .unwrap();
        assert_eq!(fraud.status, CheckStatus::Failed);
        assert_eq!(fraud.error_kind(), Some("agent_error"));
        assert_eq!(scorer.calls(), 3);
        assert_eq!(
            rig.metrics.agent_failures.with_label_values(&["fraud_score"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn panicking_agent_becomes_failed_result() {
        let rig = rig(NullCollaborators::new(), Duration::from_secs(5));
        let (req, snap) = kyc_request();
        let clock: Arc<dyn Clock> = Arc::new(NullClock::new(fixtures::AS_OF));
        let results = rig
            .scheduler
            .fan_out(&req, snap, roster(VerificationType::Kyc), move |kind, ctx| {
                let clock = clock.clone();
                async move {
                    if kind == AgentKind::Aamva {
                        panic!("aamva exploded");
                    }
                    veriflow_agents::evaluate(kind, &ctx, clock.as_ref()).await
                }
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 10);
        let aamva = results.iter().find(|r| r.agent_type == AgentKind::Aamva).unwrap();
        assert_eq!(aamva.error_kind(), Some("panic"));
        assert_eq!(aamva.details["message"], "aamva exploded");
        assert_eq!(
            rig.metrics.agent_failures.with_label_values(&["aamva"]).get(),
            1
        );
    }

    #[test]
    fn panic_payloads_are_readable() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("boom"));
        assert_eq!(panic_message(owned.as_ref()), "boom");
        let number: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(number.as_ref()), "agent panicked");
    }
}
