//! Fraud score: the live scorer plus network and activity signals.
//!
//! The only KYC agent that calls out at run time. Transient scorer failures are
//! retried under the context's backoff; a failure that survives it fails this agent
//! alone.

use veriflow_types::evidence::doc;
use veriflow_types::CheckItem;

use crate::docs::FraudSignals;
use crate::{AgentContext, AgentError, AgentOutcome};

pub const SCORE_THRESHOLD: f64 = 70.0;
pub const NETWORK_RISK_THRESHOLD: f64 = 60.0;
pub const MAX_ASSOCIATED_USERS: usize = 3;
const FLAGGED_ACTIVITY_TYPES: [&str; 3] = ["chargeback", "dispute", "refund"];

pub async fn run(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let signals: Option<FraudSignals> = ctx.document(doc::FRAUD_SIGNALS)?;
    let score = ctx
        .retry
        .run("fraud_score", || ctx.integrations.fraud.score(&ctx.subject_id))
        .await?;

    let mut checks = vec![CheckItem::pass_if(
        "Fraud Score",
        score <= SCORE_THRESHOLD,
        format!("Live fraud score: {score}, threshold: {SCORE_THRESHOLD}"),
    )];

    match &signals {
        None => {
            checks.push(CheckItem::not_applicable("Fraud Network", "No fraud signals on file"));
            checks.push(CheckItem::not_applicable("Flagged Activities", "No fraud signals on file"));
        }
        Some(s) => {
            let associated = s.network.associated_users.len();
            checks.push(CheckItem::pass_if(
                "Fraud Network",
                s.network.risk_score <= NETWORK_RISK_THRESHOLD && associated <= MAX_ASSOCIATED_USERS,
                format!(
                    "Network risk: {}, associated users: {associated}",
                    s.network.risk_score
                ),
            ));
            let flagged = s
                .activities
                .iter()
                .filter(|a| {
                    a.status == "failed" || FLAGGED_ACTIVITY_TYPES.contains(&a.kind.as_str())
                })
                .count();
            checks.push(CheckItem::pass_if(
                "Flagged Activities",
                flagged == 0,
                format!("Flagged activities: {flagged}"),
            ));
        }
    }

    Ok(AgentOutcome::new(checks).with_details(serde_json::json!({ "score": score })))
}
