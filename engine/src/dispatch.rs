//! Work lanes.
//!
//! A lane is a bounded job queue drained by a dispatcher task that runs at most
//! `capacity` workflows at once. Top-level requests and UBO children travel on
//! separate lanes, so a parent holding a main worker slot never waits on its own
//! slot to free up.
//!
//! [`Admission`] owns the bookkeeping around a job's life: store record,
//! registry row, metrics, and the completion handle.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn, Instrument};

use veriflow_store::RecordStore;
use veriflow_types::{Clock, VerificationId, VerificationRequest, VerificationStatus};

use crate::metrics::EngineMetrics;
use crate::registry::{Phase, WorkflowRegistry};
use crate::workflow::WorkflowRunner;
use crate::EngineError;

/// One queued workflow.
pub struct Job {
    pub request: VerificationRequest,
    pub cancel: watch::Receiver<bool>,
    /// Fired with the terminal status once the job is retired.
    pub done: Option<oneshot::Sender<VerificationStatus>>,
}

/// Record keeping shared by intake, the UBO coordinator, the lanes and the
/// workflows.
pub struct Admission {
    store: Arc<dyn RecordStore>,
    registry: RwLock<WorkflowRegistry>,
    metrics: Arc<EngineMetrics>,
    clock: Arc<dyn Clock>,
}

impl Admission {
    pub fn new(
        store: Arc<dyn RecordStore>,
        metrics: Arc<EngineMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry: RwLock::new(WorkflowRegistry::new()),
            metrics,
            clock,
        }
    }

    pub fn registry(&self) -> &RwLock<WorkflowRegistry> {
        &self.registry
    }

    /// Persist a pending request, track it, and queue it on `lane`. Waits while
    /// the lane is full.
    pub async fn admit(
        &self,
        request: VerificationRequest,
        lane: &mpsc::Sender<Job>,
        done: Option<oneshot::Sender<VerificationStatus>>,
    ) -> Result<(), EngineError> {
        self.store.create_request(&request)?;
        let cancel = self.registry.write().await.register(&request);
        self.metrics.verifications_started.inc();
        self.metrics.in_flight.inc();
        info!(
            verification_id = %request.id,
            verification_type = %request.verification_type,
            subject = %request.subject_id,
            parent = ?request.parent_verification_id,
            "verification pending"
        );

        let job = Job {
            request,
            cancel,
            done,
        };
        if let Err(mpsc::error::SendError(job)) = lane.send(job).await {
            self.abandon(job, "shutdown").await;
            return Err(EngineError::ShuttingDown);
        }
        Ok(())
    }

    pub async fn set_phase(&self, id: &VerificationId, phase: Phase) {
        self.registry.write().await.set_phase(id, phase);
    }

    /// Fail a job that never started.
    pub async fn abandon(&self, job: Job, reason: &str) {
        let id = &job.request.id;
        match self.store.transition_from(
            id,
            VerificationStatus::Pending,
            VerificationStatus::Failed,
            Some(reason.to_string()),
            self.clock.now(),
        ) {
            Ok(_) => warn!(verification_id = %id, reason, "verification abandoned"),
            Err(e) => debug!(verification_id = %id, error = %e, "abandoned job already settled"),
        }
        self.retire(id, job.done).await;
    }

    /// Drop the registry row, settle the metrics from the stored outcome and
    /// fire the completion handle.
    pub async fn retire(
        &self,
        id: &VerificationId,
        done: Option<oneshot::Sender<VerificationStatus>>,
    ) -> VerificationStatus {
        self.registry.write().await.remove(id);
        self.metrics.in_flight.dec();

        let status = match self.store.get_request(id) {
            Ok(request) => {
                match request.status {
                    VerificationStatus::Completed => self.metrics.verifications_completed.inc(),
                    VerificationStatus::Failed => {
                        let reason = request.failure_reason.as_deref().unwrap_or("unknown");
                        let label = reason.split(':').next().unwrap_or(reason);
                        self.metrics
                            .verifications_failed
                            .with_label_values(&[label])
                            .inc();
                    }
                    VerificationStatus::Pending | VerificationStatus::Processing => {
                        error!(verification_id = %id, status = %request.status, "retired before reaching a terminal state");
                    }
                }
                request.status
            }
            Err(e) => {
                error!(verification_id = %id, error = %e, "retired request unreadable");
                VerificationStatus::Failed
            }
        };

        if let Some(done) = done {
            let _ = done.send(status);
        }
        status
    }
}

/// Spawn the dispatcher for one lane.
pub fn spawn_lane(
    name: &'static str,
    jobs: mpsc::Receiver<Job>,
    capacity: usize,
    runner: Arc<WorkflowRunner>,
    shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let span = tracing::info_span!("lane", lane = name);
    tokio::spawn(run_lane(jobs, capacity, runner, shutdown).instrument(span))
}

async fn run_lane(
    mut jobs: mpsc::Receiver<Job>,
    capacity: usize,
    runner: Arc<WorkflowRunner>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let permits = Arc::new(Semaphore::new(capacity));
    let mut running = JoinSet::new();
    debug!(capacity, "lane started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => break,

            Some(joined) = running.join_next(), if !running.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "workflow task died");
                }
            }

            job = jobs.recv() => {
                let Some(job) = job else { break };
                let permit = tokio::select! {
                    biased;
                    _ = shutdown.recv() => {
                        runner.admission().abandon(job, "shutdown").await;
                        break;
                    }
                    permit = permits.clone().acquire_owned() => permit,
                };
                let Ok(permit) = permit else {
                    runner.admission().abandon(job, "shutdown").await;
                    break;
                };
                let runner = runner.clone();
                running.spawn(async move {
                    runner.run(job).await;
                    drop(permit);
                });
            }
        }
    }

    // Refuse new work, fail whatever is still queued, then wait for running
    // workflows to observe the shutdown and settle.
    jobs.close();
    let mut drained = 0usize;
    while let Ok(job) = jobs.try_recv() {
        runner.admission().abandon(job, "shutdown").await;
        drained += 1;
    }
    while let Some(joined) = running.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "workflow task died");
        }
    }
    info!(drained, "lane stopped");
}
