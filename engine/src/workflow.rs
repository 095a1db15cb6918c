//! One verification from pickup to terminal state.
//!
//! Phases run in order: acquire, persist the snapshot, admit UBO children (KYB),
//! run the agents, join the children, compile. The whole sequence races the
//! request's cancel signal, engine shutdown and the workflow ceiling; whichever
//! settles first decides the outcome. A report is written only on success, and
//! always before the request is marked `completed`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, Instrument};

use veriflow_store::RecordStore;
use veriflow_types::{
    Clock, VerificationReport, VerificationRequest, VerificationStatus, VerificationType,
};
use veriflow_utils::format_duration;

use crate::acquisition::{AcquisitionError, Acquirer};
use crate::compiler::Compiler;
use crate::dispatch::{Admission, Job};
use crate::metrics::EngineMetrics;
use crate::registry::Phase;
use crate::scheduler::Scheduler;
use crate::shutdown::ShutdownController;
use crate::tracing_spans;
use crate::ubo::UboCoordinator;
use crate::EngineError;

pub struct WorkflowRunner {
    store: Arc<dyn RecordStore>,
    acquirer: Acquirer,
    scheduler: Scheduler,
    ubo: UboCoordinator,
    compiler: Compiler,
    admission: Arc<Admission>,
    shutdown: Arc<ShutdownController>,
    metrics: Arc<EngineMetrics>,
    clock: Arc<dyn Clock>,
    workflow_timeout: Duration,
}

impl WorkflowRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn RecordStore>,
        acquirer: Acquirer,
        scheduler: Scheduler,
        ubo: UboCoordinator,
        compiler: Compiler,
        admission: Arc<Admission>,
        shutdown: Arc<ShutdownController>,
        metrics: Arc<EngineMetrics>,
        clock: Arc<dyn Clock>,
        workflow_timeout: Duration,
    ) -> Self {
        Self {
            store,
            acquirer,
            scheduler,
            ubo,
            compiler,
            admission,
            shutdown,
            metrics,
            clock,
            workflow_timeout,
        }
    }

    pub fn admission(&self) -> &Arc<Admission> {
        &self.admission
    }

    /// Drive one job to a terminal state and retire it.
    pub async fn run(&self, job: Job) -> VerificationStatus {
        let Job {
            request,
            mut cancel,
            done,
        } = job;
        let span = tracing_spans::workflow_span(
            &request.id,
            request.verification_type,
            request.parent_verification_id.as_ref(),
        );

        async {
            // Cancelled or shut down while queued: nothing to run.
            let request = match self.store.transition_from(
                &request.id,
                VerificationStatus::Pending,
                VerificationStatus::Processing,
                None,
                self.clock.now(),
            ) {
                Ok(processing) => processing,
                Err(e) => {
                    debug!(error = %e, "request settled before pickup");
                    return self.admission.retire(&request.id, done).await;
                }
            };
            info!(subject = %request.subject_id, "verification processing");

            let started = Instant::now();
            let mut shutdown = self.shutdown.subscribe();
            let outcome = if self.shutdown.is_triggered() {
                Err(EngineError::ShuttingDown)
            } else {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => Err(EngineError::ShuttingDown),
                    _ = cancelled(&mut cancel) => Err(EngineError::Cancelled),
                    outcome = tokio::time::timeout(self.workflow_timeout, self.phases(&request)) => {
                        outcome.unwrap_or(Err(EngineError::WorkflowTimeout))
                    }
                }
            };

            self.settle(&request, outcome, started);
            self.admission.retire(&request.id, done).await
        }
        .instrument(span)
        .await
    }

    async fn phases(&self, request: &VerificationRequest) -> Result<VerificationReport, EngineError> {
        self.admission.set_phase(&request.id, Phase::Acquiring).await;
        let snapshot = self.acquirer.acquire(request).await?;
        self.store.put_snapshot(&snapshot)?;
        let snapshot = Arc::new(snapshot);

        let children = match request.verification_type {
            VerificationType::Kyb => {
                let owners = snapshot.beneficial_owners().map_err(|e| {
                    AcquisitionError::Malformed {
                        document: veriflow_types::evidence::doc::BENEFICIAL_OWNERS,
                        reason: e.to_string(),
                    }
                })?;
                self.ubo.spawn_children(request, &owners).await?
            }
            VerificationType::Kyc => Vec::new(),
        };

        self.admission.set_phase(&request.id, Phase::RunningAgents).await;
        let results = self.scheduler.run(request, snapshot).await?;

        if !children.is_empty() {
            self.admission.set_phase(&request.id, Phase::AwaitingUbos).await;
        }
        let ubos = self.ubo.join(children).await?;

        self.admission.set_phase(&request.id, Phase::Compiling).await;
        Ok(self.compiler.compile(request, results, ubos).await?)
    }

    /// Write the outcome: report then `completed`, or `failed` with a reason.
    fn settle(
        &self,
        request: &VerificationRequest,
        outcome: Result<VerificationReport, EngineError>,
        started: Instant,
    ) {
        let elapsed = started.elapsed();
        self.metrics
            .workflow_duration_ms
            .observe(elapsed.as_secs_f64() * 1000.0);

        let outcome = outcome.and_then(|report| {
            self.store.put_report(&report)?;
            Ok(report)
        });
        let written = match outcome {
            Ok(report) => {
                let completed = self.store.transition_from(
                    &request.id,
                    VerificationStatus::Processing,
                    VerificationStatus::Completed,
                    None,
                    self.clock.now(),
                );
                match completed {
                    Ok(_) => {
                        info!(
                            overall = %report.overall_status,
                            elapsed = %format_duration(elapsed),
                            "verification completed"
                        );
                        Ok(())
                    }
                    // A report only stands next to a completed request.
                    Err(e) => {
                        if let Err(cleanup) = self.store.delete_report(&request.id) {
                            error!(error = %cleanup, "could not withdraw report");
                        }
                        Err(e)
                    }
                }
            }
            Err(e) => {
                let reason = e.failure_reason();
                error!(%reason, error = %e, elapsed = %format_duration(elapsed), "verification failed");
                self.store
                    .transition_from(
                        &request.id,
                        VerificationStatus::Processing,
                        VerificationStatus::Failed,
                        Some(reason),
                        self.clock.now(),
                    )
                    .map(|_| ())
            }
        };
        if let Err(e) = written {
            error!(error = %e, "could not record terminal status");
        }
    }
}

/// Resolves once the request has been cancelled.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}
