//! What an agent sees, and what it hands back.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use veriflow_integrations::{Integrations, RetryPolicy};
use veriflow_types::{
    AgentKind, CheckItem, CheckResult, EvidenceSnapshot, SubjectId, Timestamp, VerificationId,
};

use crate::AgentError;

/// Read-only inputs for one agent run.
#[derive(Clone)]
pub struct AgentContext {
    pub verification_id: VerificationId,
    pub subject_id: SubjectId,
    pub evidence: Arc<EvidenceSnapshot>,
    pub integrations: Arc<Integrations>,
    /// Backoff for the agent's own external calls.
    pub retry: RetryPolicy,
}

impl AgentContext {
    pub fn new(
        verification_id: VerificationId,
        subject_id: SubjectId,
        evidence: Arc<EvidenceSnapshot>,
        integrations: Arc<Integrations>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            verification_id,
            subject_id,
            evidence,
            integrations,
            retry,
        }
    }

    /// Reference "now" for date arithmetic: the moment the evidence was collected.
    /// Agents never read the wall clock, so a run is reproducible from its snapshot.
    pub fn as_of(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.evidence.collected_at.as_secs() as i64, 0)
            .unwrap_or_default()
    }

    /// Decode an optional document. Absent is `Ok(None)`; present but undecodable is
    /// an error.
    pub fn document<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AgentError> {
        match self.evidence.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(raw) => serde_json::from_value(raw.clone())
                .map(Some)
                .map_err(|e| AgentError::MalformedDocument {
                    document: name.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Decode a document the agent cannot work without.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, AgentError> {
        self.document(name)?
            .ok_or_else(|| AgentError::MissingDocument(name.to_string()))
    }
}

/// Itemised checks plus free-form details, before they are stamped into a result.
#[derive(Clone, Debug, Default)]
pub struct AgentOutcome {
    pub checks: Vec<CheckItem>,
    pub details: serde_json::Value,
}

impl AgentOutcome {
    pub fn new(checks: Vec<CheckItem>) -> Self {
        Self {
            checks,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    pub fn into_result(
        self,
        verification_id: VerificationId,
        kind: AgentKind,
        produced_at: Timestamp,
    ) -> CheckResult {
        CheckResult::from_checks(verification_id, kind, self.checks, self.details, produced_at)
    }
}
