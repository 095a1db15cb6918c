//! The engine facade: intake, reporting, cancellation and lifecycle.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use veriflow_integrations::Integrations;
use veriflow_store::{RecordStore, StoreError};
use veriflow_types::{
    AdditionalData, Clock, SubjectId, VerificationId, VerificationReport, VerificationRequest,
    VerificationStatus, VerificationType,
};

use crate::acquisition::Acquirer;
use crate::compiler::Compiler;
use crate::config::EngineConfig;
use crate::dispatch::{self, Admission, Job};
use crate::metrics::EngineMetrics;
use crate::registry::InFlight;
use crate::scheduler::Scheduler;
use crate::shutdown::ShutdownController;
use crate::ubo::UboCoordinator;
use crate::workflow::WorkflowRunner;
use crate::EngineError;

/// Answer to [`VerificationEngine::get_report`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ReportStatus {
    Ready(VerificationReport),
    InProgress(VerificationStatus),
    Failed(String),
    NotFound,
}

struct Receivers {
    main: mpsc::Receiver<Job>,
    sub: mpsc::Receiver<Job>,
}

pub struct VerificationEngine {
    config: EngineConfig,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    shutdown: Arc<ShutdownController>,
    admission: Arc<Admission>,
    runner: Arc<WorkflowRunner>,
    main_lane: mpsc::Sender<Job>,
    pending_receivers: Mutex<Option<Receivers>>,
    lanes: Mutex<Vec<JoinHandle<()>>>,
}

impl VerificationEngine {
    /// Wire every component. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: EngineConfig,
        integrations: Integrations,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let integrations = Arc::new(integrations);
        let metrics = Arc::new(EngineMetrics::new()?);
        let shutdown = Arc::new(ShutdownController::new());
        let admission = Arc::new(Admission::new(store.clone(), metrics.clone(), clock.clone()));

        let (main_lane, main_rx) = mpsc::channel(config.queue_capacity);
        let (sub_lane, sub_rx) = mpsc::channel(config.queue_capacity);

        let acquirer = Acquirer::new(integrations.clone(), config.retry_policy(), clock.clone());
        let scheduler = Scheduler::new(
            integrations.clone(),
            store.clone(),
            metrics.clone(),
            clock.clone(),
            config.retry_policy(),
            config.agent_timeout(),
            config.max_agent_concurrency,
        );
        let ubo = UboCoordinator::new(store.clone(), admission.clone(), sub_lane, clock.clone());
        let compiler = Compiler::new(
            config.policy.clone(),
            integrations.summarizer.clone(),
            clock.clone(),
        );
        let runner = Arc::new(WorkflowRunner::new(
            store.clone(),
            acquirer,
            scheduler,
            ubo,
            compiler,
            admission.clone(),
            shutdown.clone(),
            metrics.clone(),
            clock.clone(),
            config.workflow_timeout(),
        ));

        Ok(Self {
            config,
            store,
            clock,
            metrics,
            shutdown,
            admission,
            runner,
            main_lane,
            pending_receivers: Mutex::new(Some(Receivers {
                main: main_rx,
                sub: sub_rx,
            })),
            lanes: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the main and sub-verification lanes.
    pub async fn start(&self) -> Result<(), EngineError> {
        let receivers = self
            .pending_receivers
            .lock()
            .await
            .take()
            .ok_or(EngineError::AlreadyStarted)?;
        let mut lanes = self.lanes.lock().await;
        lanes.push(dispatch::spawn_lane(
            "main",
            receivers.main,
            self.config.worker_capacity,
            self.runner.clone(),
            self.shutdown.subscribe(),
        ));
        lanes.push(dispatch::spawn_lane(
            "sub",
            receivers.sub,
            self.config.sub_capacity,
            self.runner.clone(),
            self.shutdown.subscribe(),
        ));
        info!(
            workers = self.config.worker_capacity,
            sub_workers = self.config.sub_capacity,
            queue = self.config.queue_capacity,
            "verification engine started"
        );
        Ok(())
    }

    /// Create a pending request and queue it. Waits while the queue is full.
    pub async fn start_verification(
        &self,
        verification_type: VerificationType,
        subject_id: impl Into<SubjectId>,
        additional_data: AdditionalData,
    ) -> Result<VerificationId, EngineError> {
        if self.shutdown.is_triggered() {
            return Err(EngineError::ShuttingDown);
        }
        if self.pending_receivers.lock().await.is_some() {
            return Err(EngineError::NotStarted);
        }
        let subject_id = subject_id.into();
        if !subject_id.is_valid() {
            return Err(EngineError::InvalidSubject(subject_id.to_string()));
        }

        let request =
            VerificationRequest::new(verification_type, subject_id, additional_data, self.clock.now());
        let id = request.id.clone();
        self.admission.admit(request, &self.main_lane, None).await?;
        Ok(id)
    }

    /// Report state for `id`. Repeated calls on a completed request return the
    /// same report.
    pub fn get_report(&self, id: &VerificationId) -> Result<ReportStatus, EngineError> {
        let request = match self.store.get_request(id) {
            Ok(request) => request,
            Err(e) if e.is_not_found() => return Ok(ReportStatus::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(match request.status {
            VerificationStatus::Completed => ReportStatus::Ready(self.store.get_report(id)?),
            VerificationStatus::Failed => ReportStatus::Failed(
                request
                    .failure_reason
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            status => ReportStatus::InProgress(status),
        })
    }

    /// Cancel a request. A queued request fails at once; a running one is
    /// signalled and fails when its workflow observes the signal. Returns
    /// `false` when the request had already settled.
    pub async fn cancel(&self, id: &VerificationId) -> Result<bool, EngineError> {
        let request = self.store.get_request(id).map_err(|e| {
            if e.is_not_found() {
                EngineError::NotFound(id.clone())
            } else {
                e.into()
            }
        })?;
        if request.is_terminal() {
            return Ok(false);
        }

        self.admission.registry().read().await.cancel(id);
        if request.status == VerificationStatus::Pending {
            // Only a still-queued record is ours to fail; once a worker has
            // moved it to processing, the workflow owns the write.
            match self.store.transition_from(
                id,
                VerificationStatus::Pending,
                VerificationStatus::Failed,
                Some("cancelled".to_string()),
                self.clock.now(),
            ) {
                Ok(_) => info!(verification_id = %id, "verification cancelled while queued"),
                Err(StoreError::Conflict { found, .. }) if found.is_terminal() => return Ok(false),
                Err(StoreError::Conflict { .. }) => {
                    debug!(verification_id = %id, "picked up before cancel, workflow will observe the signal")
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    /// Workflows currently queued or running.
    pub async fn in_flight(&self) -> Vec<InFlight> {
        self.admission.registry().read().await.snapshot()
    }

    /// Poll the store until `id` is terminal.
    pub async fn wait_for_terminal(
        &self,
        id: &VerificationId,
        poll: Duration,
    ) -> Result<VerificationRequest, EngineError> {
        loop {
            let request = self.store.get_request(id)?;
            if request.is_terminal() {
                return Ok(request);
            }
            tokio::time::sleep(poll).await;
        }
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop accepting work, fail queued jobs with `shutdown`, and wait for the
    /// lanes to drain.
    pub async fn shutdown(&self) {
        self.shutdown.trigger();
        let lanes: Vec<_> = self.lanes.lock().await.drain(..).collect();
        for lane in lanes {
            if let Err(e) = lane.await {
                warn!(error = %e, "lane did not stop cleanly");
            }
        }
        info!("verification engine stopped");
    }

    /// Trigger [`shutdown`](Self::shutdown) on SIGINT or SIGTERM.
    pub async fn shutdown_on_signal(&self) {
        self.shutdown.trigger_on_signal().await;
        self.shutdown().await;
    }
}
