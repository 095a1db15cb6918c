//! ID document check: class, MRZ, expiry, security features, name consistency.

use veriflow_integrations::identity::verification_kind;
use veriflow_integrations::ProviderVerification;
use veriflow_types::{CheckItem, CheckStatus};

use super::{profile, provider_status, signals};
use crate::docs::{parse_datetime, same_name};
use crate::lists::{contains_ignore_case, ACCEPTED_ID_CLASSES};
use crate::{AgentContext, AgentError, AgentOutcome};

const SECURITY_CHECKS: [&str; 3] = [
    "id_tamper_detection",
    "id_fabrication_detection",
    "id_electronic_replica_detection",
];

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let profile = profile(ctx)?;
    let signals = signals(ctx)?;
    let Some(govt_id) = signals
        .as_ref()
        .and_then(|s| s.verification(verification_kind::GOVERNMENT_ID))
    else {
        let checks = [
            "ID Document Type",
            "ID MRZ Check",
            "ID Expiration Check",
            "ID Security Features",
            "ID Data Consistency",
        ]
        .into_iter()
        .map(|name| CheckItem::not_applicable(name, "No government ID verification on file"))
        .collect();
        return Ok(AgentOutcome::new(checks));
    };

    let id_class = metadata_str(govt_id, "id_disallowed_type_detection", "detected_id_class");
    let class_item = match id_class {
        None => CheckItem::not_applicable("ID Document Type", "Document class not reported"),
        Some(class) => CheckItem::pass_if(
            "ID Document Type",
            contains_ignore_case(ACCEPTED_ID_CLASSES, class),
            format!("Document class: {class}"),
        ),
    };

    let mrz = provider_status(Some(govt_id), "id_mrz_detection");
    let mrz_item = CheckItem::new("ID MRZ Check", mrz, format!("MRZ check result: {mrz}"));

    let expiry_item = match metadata_str(govt_id, "id_expired_detection", "expiration_date")
        .and_then(parse_datetime)
    {
        Some(expires) => CheckItem::pass_if(
            "ID Expiration Check",
            expires >= ctx.as_of(),
            format!("Expires {}", expires.date_naive()),
        ),
        None => {
            let status = provider_status(Some(govt_id), "id_expired_detection");
            CheckItem::new(
                "ID Expiration Check",
                status,
                format!("Expiration check result: {status}"),
            )
        }
    };

    let security: Vec<CheckStatus> = SECURITY_CHECKS
        .iter()
        .map(|c| provider_status(Some(govt_id), c))
        .collect();
    let security_status = if security.contains(&CheckStatus::Failed) {
        CheckStatus::Failed
    } else if security.contains(&CheckStatus::Passed) {
        CheckStatus::Passed
    } else {
        CheckStatus::NotApplicable
    };
    let security_item = CheckItem::new(
        "ID Security Features",
        security_status,
        format!("Tamper, fabrication and replica checks: {security_status}"),
    );

    let name_on_id = govt_id.attributes.get("name").and_then(|v| v.as_str());
    let name_item = match name_on_id {
        Some(name) if !profile.name.trim().is_empty() => CheckItem::pass_if(
            "ID Data Consistency",
            same_name(name, &profile.name),
            format!("Name on ID: {name}, name on profile: {}", profile.name),
        ),
        _ => CheckItem::not_applicable("ID Data Consistency", "Name not available for comparison"),
    };

    Ok(AgentOutcome::new(vec![
        class_item,
        mrz_item,
        expiry_item,
        security_item,
        name_item,
    ]))
}

fn metadata_str<'a>(v: &'a ProviderVerification, check: &str, key: &str) -> Option<&'a str> {
    v.check(check)
        .and_then(|c| c.metadata.get(key))
        .and_then(|m| m.as_str())
        .filter(|s| !s.trim().is_empty())
}
