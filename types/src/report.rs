//! The final verification report.

use serde::{Deserialize, Serialize};

use crate::{CheckResult, CheckStatus, OverallStatus, SubjectId, Timestamp, VerificationId, VerificationStatus};

/// Reference from a KYB report to one beneficial owner's sub-verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UboReference {
    pub verification_id: VerificationId,
    pub user_id: SubjectId,
    /// Workflow status of the child at join time.
    pub status: VerificationStatus,
    /// The child report's overall status; `None` when the child produced no report.
    #[serde(default)]
    pub result: Option<OverallStatus>,
    /// The child's failure reason, when it failed.
    #[serde(default)]
    pub reason: Option<String>,
    /// Owner role, used to look up the UBO policy.
    #[serde(default)]
    pub role: Option<String>,
}

impl UboReference {
    /// A UBO counts as failed when its own report failed or its workflow never completed.
    pub fn is_failed(&self) -> bool {
        match self.result {
            Some(OverallStatus::Failed) => true,
            Some(_) => false,
            None => true,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.result == Some(OverallStatus::Warning)
    }
}

/// Count of check results per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub warning: usize,
    pub not_applicable: usize,
}

impl Tally {
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut tally = Self::default();
        for r in results {
            tally.record(r.status);
        }
        tally
    }

    pub fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Passed => self.passed += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Warning => self.warning += 1,
            CheckStatus::NotApplicable => self.not_applicable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.warning + self.not_applicable
    }
}

/// Immutable once written. Exists only for `completed` requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verification_id: VerificationId,
    pub overall_status: OverallStatus,
    pub summary: String,
    pub results: Vec<CheckResult>,
    #[serde(default)]
    pub ubo_references: Vec<UboReference>,
    pub tally: Tally,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ubo(result: Option<OverallStatus>) -> UboReference {
        UboReference {
            verification_id: VerificationId::generate(),
            user_id: SubjectId::new("P1"),
            status: if result.is_some() {
                VerificationStatus::Completed
            } else {
                VerificationStatus::Failed
            },
            result,
            reason: None,
            role: None,
        }
    }

    #[test]
    fn ubo_without_report_is_failed() {
        assert!(ubo(None).is_failed());
        assert!(ubo(Some(OverallStatus::Failed)).is_failed());
        assert!(!ubo(Some(OverallStatus::Warning)).is_failed());
        assert!(ubo(Some(OverallStatus::Warning)).is_warning());
    }

    #[test]
    fn tally_counts_every_status() {
        let mut t = Tally::default();
        for s in [
            CheckStatus::Passed,
            CheckStatus::Passed,
            CheckStatus::Failed,
            CheckStatus::NotApplicable,
        ] {
            t.record(s);
        }
        assert_eq!(t.passed, 2);
        assert_eq!(t.failed, 1);
        assert_eq!(t.total(), 4);
    }
}
