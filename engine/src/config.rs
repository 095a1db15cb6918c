//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use veriflow_agents::PolicyTable;
use veriflow_integrations::RetryPolicy;

use crate::EngineError;

/// Configuration for a Veriflow engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Top-level workflows that may run at once.
    #[serde(default = "default_worker_capacity")]
    pub worker_capacity: usize,

    /// Jobs that may wait for a worker before `start_verification` blocks.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// UBO sub-verifications that may run at once, on their own lane.
    #[serde(default = "default_sub_capacity")]
    pub sub_capacity: usize,

    /// Agents of one run that may execute at once.
    #[serde(default = "default_max_agent_concurrency")]
    pub max_agent_concurrency: usize,

    /// Ceiling for a single agent, in milliseconds.
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,

    /// Ceiling for a whole workflow from pickup, in milliseconds.
    #[serde(default = "default_workflow_timeout_ms")]
    pub workflow_timeout_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to print Prometheus metrics on exit.
    #[serde(default)]
    pub enable_metrics: bool,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Mandatory/advisory classification overrides.
    #[serde(default)]
    pub policy: PolicyTable,

    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

/// Backoff for transient data-source failures during acquisition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Base URLs of the external collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    #[serde(default = "default_data_source_url")]
    pub data_source_url: String,
    #[serde(default = "default_identity_url")]
    pub identity_provider_url: String,
    #[serde(default = "default_fraud_url")]
    pub fraud_scorer_url: String,
    /// No summarizer when unset; reports then carry a templated summary.
    #[serde(default)]
    pub summarizer_url: Option<String>,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_worker_capacity() -> usize {
    8
}

fn default_queue_capacity() -> usize {
    64
}

fn default_sub_capacity() -> usize {
    8
}

fn default_max_agent_concurrency() -> usize {
    16
}

fn default_agent_timeout_ms() -> u64 {
    30_000
}

fn default_workflow_timeout_ms() -> u64 {
    300_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_data_source_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_identity_url() -> String {
    "http://127.0.0.1:8082".to_string()
}

fn default_fraud_url() -> String {
    "http://127.0.0.1:8083".to_string()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let capacities = [
            ("worker_capacity", self.worker_capacity),
            ("queue_capacity", self.queue_capacity),
            ("sub_capacity", self.sub_capacity),
            ("max_agent_concurrency", self.max_agent_concurrency),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(EngineError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.agent_timeout_ms == 0 || self.workflow_timeout_ms == 0 {
            return Err(EngineError::Config("timeouts must be non-zero".into()));
        }
        let unknown = self.policy.unknown_agents();
        if !unknown.is_empty() {
            return Err(EngineError::Config(format!(
                "policy names unknown agents: {}",
                unknown.join(", ")
            )));
        }
        Ok(())
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }

    pub fn workflow_timeout(&self) -> Duration {
        Duration::from_millis(self.workflow_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_capacity: default_worker_capacity(),
            queue_capacity: default_queue_capacity(),
            sub_capacity: default_sub_capacity(),
            max_agent_concurrency: default_max_agent_concurrency(),
            agent_timeout_ms: default_agent_timeout_ms(),
            workflow_timeout_ms: default_workflow_timeout_ms(),
            retry: RetryConfig::default(),
            policy: PolicyTable::default(),
            integrations: IntegrationsConfig::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            data_source_url: default_data_source_url(),
            identity_provider_url: default_identity_url(),
            fraud_scorer_url: default_fraud_url(),
            summarizer_url: None,
            http_timeout_ms: default_http_timeout_ms(),
        }
    }
}
