//! Government ID: the provider's document authenticity checks.

use veriflow_integrations::identity::verification_kind;
use veriflow_types::CheckItem;

use super::{provider_status, signals};
use crate::{AgentContext, AgentError, AgentOutcome};

/// (display name, provider check name)
const REQUIRED_CHECKS: [(&str, &str); 14] = [
    ("Barcode Match", "id_barcode_detection"),
    ("Barcode Inconsistency", "id_barcode_inconsistency_detection"),
    ("Compromised Submission", "id_compromised_detection"),
    ("Allowed Country", "id_disallowed_country_detection"),
    ("Allowed ID Type", "id_disallowed_type_detection"),
    ("Electronic Replica", "id_electronic_replica_detection"),
    ("Expiration", "id_expired_detection"),
    ("Fabrication", "id_fabrication_detection"),
    ("Inconsistent Repeat", "id_inconsistent_repeat_detection"),
    ("PO Box", "id_po_box_detection"),
    ("Portrait Clarity", "id_portrait_clarity_detection"),
    ("Portrait", "id_portrait_detection"),
    ("Selfie-to-ID Comparison", "id_selfie_comparison"),
    ("ID Image Tampering", "id_tamper_detection"),
];

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let signals = signals(ctx)?;
    let govt_id = signals
        .as_ref()
        .and_then(|s| s.verification(verification_kind::GOVERNMENT_ID));

    let checks = REQUIRED_CHECKS
        .iter()
        .map(|(name, provider_name)| {
            let status = provider_status(govt_id, provider_name);
            CheckItem::new(*name, status, format!("{name} check result: {status}"))
        })
        .collect();

    Ok(AgentOutcome::new(checks))
}
