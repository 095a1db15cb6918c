//! Result compiler: folds agent results and UBO references into the report.
//!
//! The aggregation is a pure function of the results, the UBO references and the
//! policy table. Everything that can go wrong before aggregation (foreign
//! results, duplicates, gaps in the roster) is a [`CompilationError`], and the
//! workflow fails the request without writing a report.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn, Instrument};

use veriflow_agents::{roster, PolicyTable};
use veriflow_integrations::Summarizer;
use veriflow_types::{
    AgentKind, CheckResult, CheckStatus, Clock, OverallStatus, Tally, UboReference,
    VerificationId, VerificationReport, VerificationRequest, VerificationType,
};

use crate::tracing_spans;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompilationError {
    #[error("result from {agent} belongs to {found}, not {expected}")]
    ForeignResult {
        agent: AgentKind,
        expected: VerificationId,
        found: VerificationId,
    },

    #[error("more than one result from {0}")]
    DuplicateAgent(AgentKind),

    #[error("{agent} does not run for {verification_type} verifications")]
    OutsideRoster {
        agent: AgentKind,
        verification_type: VerificationType,
    },

    #[error("no result from {0}")]
    MissingAgent(AgentKind),
}

/// Check that `results` hold exactly one result per rostered agent of this request.
pub fn validate(
    request: &VerificationRequest,
    results: &[CheckResult],
) -> Result<(), CompilationError> {
    let expected = roster(request.verification_type);
    let mut seen = BTreeSet::new();
    for r in results {
        if r.verification_id != request.id {
            return Err(CompilationError::ForeignResult {
                agent: r.agent_type,
                expected: request.id.clone(),
                found: r.verification_id.clone(),
            });
        }
        if !expected.contains(&r.agent_type) {
            return Err(CompilationError::OutsideRoster {
                agent: r.agent_type,
                verification_type: request.verification_type,
            });
        }
        if !seen.insert(r.agent_type) {
            return Err(CompilationError::DuplicateAgent(r.agent_type));
        }
    }
    match expected.iter().find(|k| !seen.contains(k)) {
        Some(missing) => Err(CompilationError::MissingAgent(*missing)),
        None => Ok(()),
    }
}

/// The overall verdict.
///
/// Failed when any mandatory result failed or any mandatory UBO failed. Otherwise
/// warning when anything warned, an advisory result failed, or an advisory UBO
/// failed. Otherwise passed. `not_applicable` never moves the verdict.
pub fn overall_status(
    results: &[CheckResult],
    ubos: &[UboReference],
    policy: &PolicyTable,
) -> OverallStatus {
    let mut warned = false;

    for r in results {
        match r.status {
            CheckStatus::Failed if policy.requirement(r.agent_type).is_mandatory() => {
                return OverallStatus::Failed;
            }
            CheckStatus::Failed | CheckStatus::Warning => warned = true,
            CheckStatus::Passed | CheckStatus::NotApplicable => {}
        }
    }

    for ubo in ubos {
        if ubo.is_failed() {
            if policy.ubo.requirement(ubo.role.as_deref()).is_mandatory() {
                return OverallStatus::Failed;
            }
            warned = true;
        } else if ubo.is_warning() {
            warned = true;
        }
    }

    if warned {
        OverallStatus::Warning
    } else {
        OverallStatus::Passed
    }
}

/// Deterministic summary used when no summary service answers.
pub fn templated_summary(overall: OverallStatus, tally: &Tally, ubos: &[UboReference]) -> String {
    let mut summary = format!(
        "Verification {}: {} checks run, {} passed, {} failed, {} warnings, {} not applicable.",
        overall,
        tally.total(),
        tally.passed,
        tally.failed,
        tally.warning,
        tally.not_applicable,
    );
    if !ubos.is_empty() {
        let failed = ubos.iter().filter(|u| u.is_failed()).count();
        summary.push_str(&format!(
            " {} beneficial owners verified, {} failed.",
            ubos.len(),
            failed
        ));
    }
    summary
}

/// Builds reports for finished runs.
pub struct Compiler {
    policy: PolicyTable,
    summarizer: Option<Arc<dyn Summarizer>>,
    clock: Arc<dyn Clock>,
}

impl Compiler {
    pub fn new(
        policy: PolicyTable,
        summarizer: Option<Arc<dyn Summarizer>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            policy,
            summarizer,
            clock,
        }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub async fn compile(
        &self,
        request: &VerificationRequest,
        mut results: Vec<CheckResult>,
        ubos: Vec<UboReference>,
    ) -> Result<VerificationReport, CompilationError> {
        let span = tracing_spans::compile_span(results.len());
        async {
            validate(request, &results)?;
            results.sort_by_key(|r| r.agent_type);

            let overall = overall_status(&results, &ubos, &self.policy);
            let tally = Tally::from_results(&results);
            let summary = self.summarize(overall, &tally, &results, &ubos).await;
            debug!(%overall, failed = tally.failed, warnings = tally.warning, "report compiled");

            Ok(VerificationReport {
                verification_id: request.id.clone(),
                overall_status: overall,
                summary,
                results,
                ubo_references: ubos,
                tally,
                created_at: self.clock.now(),
            })
        }
        .instrument(span)
        .await
    }

    async fn summarize(
        &self,
        overall: OverallStatus,
        tally: &Tally,
        results: &[CheckResult],
        ubos: &[UboReference],
    ) -> String {
        if let Some(summarizer) = &self.summarizer {
            match summarizer.summarize(results, ubos).await {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => warn!("summary service returned nothing, using template"),
                Err(e) => warn!(error = %e, "summary service unavailable, using template"),
            }
        }
        templated_summary(overall, tally, ubos)
    }
}
