//! Selfie-to-ID comparison with a confidence floor.

use veriflow_integrations::identity::verification_kind;
use veriflow_types::{CheckItem, CheckStatus};

use super::signals;
use crate::{AgentContext, AgentError, AgentOutcome};

/// Minimum provider confidence for a selfie match to count.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let signals = signals(ctx)?;
    let comparison = signals
        .as_ref()
        .and_then(|s| s.verification(verification_kind::GOVERNMENT_ID))
        .and_then(|v| v.check("id_selfie_comparison"));

    let Some(comparison) = comparison else {
        return Ok(AgentOutcome::new(vec![
            CheckItem::not_applicable("ID to Selfie Comparison", "No selfie comparison on file"),
            CheckItem::not_applicable("Facial Anomalies", "No selfie comparison on file"),
        ]));
    };

    let confidence = comparison
        .metadata
        .get("confidence_score")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let matched = CheckStatus::from_provider(&comparison.status) == CheckStatus::Passed
        && confidence >= CONFIDENCE_THRESHOLD;

    Ok(AgentOutcome::new(vec![
        CheckItem::pass_if(
            "ID to Selfie Comparison",
            matched,
            format!(
                "Provider status: {}, confidence score: {confidence:.2}",
                comparison.status
            ),
        ),
        CheckItem::pass_if(
            "Facial Anomalies",
            matched,
            if matched {
                "No anomalies detected"
            } else {
                "Anomalies detected"
            },
        ),
    ])
    .with_details(serde_json::json!({ "confidence_score": confidence })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{kyc_ctx, kyc_snapshot, set_check_metadata};
    use veriflow_types::evidence::doc;

    #[test]
    fn high_confidence_match_passes() {
        let out = evaluate(&kyc_ctx(kyc_snapshot())).unwrap();
        assert!(out.checks.iter().all(|c| c.status == CheckStatus::Passed));
    }

    #[test]
    fn low_confidence_fails_even_when_provider_passed() {
        let snap = set_check_metadata(
            kyc_snapshot(),
            "id_selfie_comparison",
            "confidence_score",
            serde_json::json!(0.55),
        );
        let out = evaluate(&kyc_ctx(snap)).unwrap();
        assert!(out.checks.iter().all(|c| c.status == CheckStatus::Failed));
    }

    #[test]
    fn no_signals_is_not_applicable() {
        let mut snap = kyc_snapshot();
        snap.documents.remove(doc::ID_CHECK);
        let out = evaluate(&kyc_ctx(snap)).unwrap();
        assert!(out
            .checks
            .iter()
            .all(|c| c.status == CheckStatus::NotApplicable));
    }
}
