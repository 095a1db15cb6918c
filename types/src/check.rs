//! Check results produced by agents.

use serde::{Deserialize, Serialize};

use crate::{AgentKind, CheckStatus, Timestamp, VerificationId};

/// One itemised sub-check evaluated by an agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckItem {
    pub name: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub details: String,
}

impl CheckItem {
    pub fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            details: details.into(),
        }
    }

    pub fn passed(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Passed, details)
    }

    pub fn failed(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Failed, details)
    }

    pub fn warning(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warning, details)
    }

    pub fn not_applicable(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::NotApplicable, details)
    }

    /// `passed` when `ok`, else `failed`.
    pub fn pass_if(name: impl Into<String>, ok: bool, details: impl Into<String>) -> Self {
        let status = if ok {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        };
        Self::new(name, status, details)
    }
}

/// Fold itemised statuses into one: any failed wins, then warning, then passed.
/// An empty list, or a list of only `not_applicable`, is `not_applicable`.
pub fn derive_status(items: &[CheckItem]) -> CheckStatus {
    let has = |s: CheckStatus| items.iter().any(|i| i.status == s);
    if has(CheckStatus::Failed) {
        CheckStatus::Failed
    } else if has(CheckStatus::Warning) {
        CheckStatus::Warning
    } else if has(CheckStatus::Passed) {
        CheckStatus::Passed
    } else {
        CheckStatus::NotApplicable
    }
}

/// The single structured result one agent produces for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub verification_id: VerificationId,
    pub agent_type: AgentKind,
    pub check_name: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub checks: Vec<CheckItem>,
    pub produced_at: Timestamp,
}

impl CheckResult {
    /// Build a result whose status is derived from its itemised checks.
    pub fn from_checks(
        verification_id: VerificationId,
        agent_type: AgentKind,
        checks: Vec<CheckItem>,
        details: serde_json::Value,
        produced_at: Timestamp,
    ) -> Self {
        Self {
            verification_id,
            agent_type,
            check_name: agent_type.display_name().to_string(),
            status: derive_status(&checks),
            details,
            checks,
            produced_at,
        }
    }

    /// A failed result standing in for an agent that errored, panicked or timed out.
    ///
    /// `kind` is a short machine tag (`agent_error`, `timeout`, `panic`).
    pub fn failure(
        verification_id: VerificationId,
        agent_type: AgentKind,
        kind: &str,
        message: impl Into<String>,
        produced_at: Timestamp,
    ) -> Self {
        Self {
            verification_id,
            agent_type,
            check_name: agent_type.display_name().to_string(),
            status: CheckStatus::Failed,
            details: serde_json::json!({ "error": kind, "message": message.into() }),
            checks: Vec::new(),
            produced_at,
        }
    }

    /// The failure tag set by [`CheckResult::failure`], if any.
    pub fn error_kind(&self) -> Option<&str> {
        self.details.get("error").and_then(|v| v.as_str())
    }
}
