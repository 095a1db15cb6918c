//! Status enums: the verification state machine and check/report verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Lifecycle status of a `VerificationRequest`.
///
/// `Pending → Processing → {Completed, Failed}`. `Pending → Failed` is also allowed
/// (cancelled or shut down while still queued). Terminal states never re-open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Created and queued.
    Pending,
    /// Acquisition, scheduling or compilation underway.
    Processing,
    /// Report written.
    Completed,
    /// Aborted; a failure reason is recorded and no report exists.
    Failed,
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Position along the lifecycle; strictly increases on every valid transition.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub fn can_transition_to(&self, next: VerificationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    /// Checked transition. The only way any component moves a request forward.
    pub fn transition(self, next: VerificationStatus) -> Result<Self, TypesError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TypesError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single check (or of one agent as a whole).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Failed,
    Warning,
    NotApplicable,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Warning => "warning",
            Self::NotApplicable => "not_applicable",
        }
    }

    /// Lenient mapping of provider-reported status strings.
    ///
    /// Identity providers report `passed`/`failed` plus assorted vocabulary; anything
    /// unrecognised is treated as "no signal".
    pub fn from_provider(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "passed" | "pass" | "success" | "approved" | "clear" => Self::Passed,
            "failed" | "fail" | "declined" | "match" | "hit" => Self::Failed,
            "warning" | "needs_review" | "review" => Self::Warning,
            _ => Self::NotApplicable,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(Self::Passed),
            "failed" => Ok(Self::Failed),
            "warning" => Ok(Self::Warning),
            "not_applicable" => Ok(Self::NotApplicable),
            other => Err(TypesError::UnknownStatus(other.to_string())),
        }
    }
}

/// The overall verdict written on a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Passed,
    Warning,
    Failed,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
