//! Prometheus metrics for the Veriflow engine.
//!
//! [`EngineMetrics`] owns a dedicated [`Registry`]; the daemon encodes it into
//! the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Histogram,
    HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::EngineError;

/// Central collection of all engine-level Prometheus metrics.
pub struct EngineMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Verifications accepted at intake, children included.
    pub verifications_started: IntCounter,
    /// Verifications that reached `completed`.
    pub verifications_completed: IntCounter,
    /// Verifications that reached `failed`, labelled by reason.
    pub verifications_failed: IntCounterVec,
    /// Agents that errored or panicked, labelled by agent.
    pub agent_failures: IntCounterVec,
    /// Agents that hit their ceiling, labelled by agent.
    pub agent_timeouts: IntCounterVec,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Workflows queued or running.
    pub in_flight: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from pickup to terminal state, in milliseconds.
    pub workflow_duration_ms: Histogram,
}

fn register_err(e: prometheus::Error) -> EngineError {
    EngineError::Config(format!("failed to register metric: {e}"))
}

impl EngineMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, EngineError> {
        let registry = Registry::new();

        let verifications_started = register_int_counter_with_registry!(
            Opts::new(
                "veriflow_verifications_started_total",
                "Verifications accepted at intake"
            ),
            registry
        )
        .map_err(register_err)?;

        let verifications_completed = register_int_counter_with_registry!(
            Opts::new(
                "veriflow_verifications_completed_total",
                "Verifications that produced a report"
            ),
            registry
        )
        .map_err(register_err)?;

        let verifications_failed = register_int_counter_vec_with_registry!(
            Opts::new(
                "veriflow_verifications_failed_total",
                "Verifications that ended without a report"
            ),
            &["reason"],
            registry
        )
        .map_err(register_err)?;

        let agent_failures = register_int_counter_vec_with_registry!(
            Opts::new(
                "veriflow_agent_failures_total",
                "Agents that errored or panicked"
            ),
            &["agent"],
            registry
        )
        .map_err(register_err)?;

        let agent_timeouts = register_int_counter_vec_with_registry!(
            Opts::new(
                "veriflow_agent_timeouts_total",
                "Agents that exceeded their time limit"
            ),
            &["agent"],
            registry
        )
        .map_err(register_err)?;

        let in_flight = register_int_gauge_with_registry!(
            Opts::new("veriflow_in_flight", "Workflows queued or running"),
            registry
        )
        .map_err(register_err)?;

        // Exponential buckets covering 1 ms to ~9 min.
        let buckets = prometheus::exponential_buckets(1.0, 2.0, 20).map_err(register_err)?;
        let workflow_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "veriflow_workflow_duration_ms",
                "Workflow duration from pickup to terminal state, in milliseconds"
            )
            .buckets(buckets),
            registry
        )
        .map_err(register_err)?;

        Ok(Self {
            registry,
            verifications_started,
            verifications_completed,
            verifications_failed,
            agent_failures,
            agent_timeouts,
            in_flight,
            workflow_duration_ms,
        })
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, EngineError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| EngineError::Config(format!("failed to encode metrics: {e}")))?;
        String::from_utf8(buf).map_err(|e| EngineError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.verifications_started.inc();
        metrics
            .verifications_failed
            .with_label_values(&["acquisition_unavailable"])
            .inc();
        let text = metrics.encode().unwrap();
        assert!(text.contains("veriflow_verifications_started_total 1"));
        assert!(text.contains("reason=\"acquisition_unavailable\""));
    }

    #[test]
    fn two_instances_do_not_collide() {
        assert!(EngineMetrics::new().is_ok());
        assert!(EngineMetrics::new().is_ok());
    }
}
