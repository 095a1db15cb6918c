//! Evidence fixtures.
//!
//! Every builder here produces evidence on which every agent passes when judged at
//! [`AS_OF`]. Tests start from a clean fixture and patch the one field they care
//! about.

use serde_json::{json, Value};

use veriflow_integrations::identity::verification_kind;
use veriflow_integrations::{IdSignals, ProviderCheck, ProviderVerification, RecordCategory};
use veriflow_types::evidence::doc;
use veriflow_types::{EvidenceSnapshot, Timestamp, VerificationId};

use crate::{NullDataSource, NullIdentityProvider};

/// 2024-06-01T00:00:00Z. Fixture dates are chosen relative to this instant.
pub const AS_OF: u64 = 1_717_200_000;

pub const DEFAULT_NAME: &str = "Jane Doe";
pub const DEFAULT_BUSINESS: &str = "Acme Robotics LLC";

/// Provider checks on a government id, all of which pass in the fixture.
const GOVERNMENT_ID_CHECKS: [&str; 15] = [
    "id_barcode_detection",
    "id_barcode_inconsistency_detection",
    "id_compromised_detection",
    "id_disallowed_country_detection",
    "id_disallowed_type_detection",
    "id_electronic_replica_detection",
    "id_expired_detection",
    "id_fabrication_detection",
    "id_inconsistent_repeat_detection",
    "id_po_box_detection",
    "id_portrait_clarity_detection",
    "id_portrait_detection",
    "id_selfie_comparison",
    "id_tamper_detection",
    "id_mrz_detection",
];

const WATCHLIST_CHECKS: [&str; 3] = [
    "watchlist_pep_detection",
    "watchlist_ofac_detection",
    "watchlist_name_similarity",
];

// ── KYC ─────────────────────────────────────────────────────────────────

pub fn inquiry_reference(subject: &str) -> String {
    format!("inq-{subject}")
}

pub fn kyc_profile(name: &str) -> Value {
    let local: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    json!({
        "name": name,
        "email": format!("{local}@example.com"),
        "phone": "+15551234567",
        "identity_verified": true,
        "address": {
            "street": "100 Congress Ave",
            "city": "Austin",
            "state": "TX",
            "postal_code": "78701",
            "country": "United States",
        },
        "drivers_license": {
            "number": "TX1234567",
            "state": "TX",
            "status": "valid",
        },
    })
}

fn passed_check(name: &str) -> ProviderCheck {
    ProviderCheck {
        name: name.to_string(),
        status: "passed".to_string(),
        metadata: Default::default(),
    }
}

/// Fully passing identity provider signals for a document issued to `name`.
pub fn id_signals(reference: &str, name: &str) -> IdSignals {
    let mut checks: Vec<ProviderCheck> =
        GOVERNMENT_ID_CHECKS.iter().map(|c| passed_check(c)).collect();
    for check in checks.iter_mut() {
        match check.name.as_str() {
            "id_selfie_comparison" => {
                check.metadata.insert("confidence_score".into(), json!(0.93));
            }
            "id_disallowed_type_detection" => {
                check
                    .metadata
                    .insert("detected_id_class".into(), json!("drivers_license"));
            }
            "id_expired_detection" => {
                check
                    .metadata
                    .insert("expiration_date".into(), json!("2030-01-01"));
            }
            _ => {}
        }
    }

    IdSignals {
        inquiry_reference: reference.to_string(),
        verifications: vec![
            ProviderVerification {
                kind: verification_kind::GOVERNMENT_ID.to_string(),
                status: "passed".to_string(),
                checks,
                attributes: [("name".to_string(), json!(name))].into_iter().collect(),
            },
            ProviderVerification {
                kind: verification_kind::WATCHLIST.to_string(),
                status: "passed".to_string(),
                checks: WATCHLIST_CHECKS.iter().map(|c| passed_check(c)).collect(),
                attributes: Default::default(),
            },
            ProviderVerification {
                kind: verification_kind::GEOLOCATION.to_string(),
                status: "passed".to_string(),
                checks: Vec::new(),
                attributes: Default::default(),
            },
        ],
    }
}

pub fn fraud_signals_clean() -> Value {
    json!({
        "scores": {"payment_abuse": 10.0},
        "network": {"risk_score": 20.0, "associated_users": []},
        "activities": [{"type": "login", "status": "success"}],
    })
}

pub fn banking_history_clean() -> Value {
    json!([{
        "verified": true,
        "transactions": [
            {"amount": 120.0, "date": "2024-05-01T10:00:00"},
            {"amount": 45.5, "date": "2024-05-08T12:00:00"},
            {"amount": 300.0, "date": "2024-05-15T09:30:00"},
        ],
    }])
}

pub fn login_history_clean() -> Value {
    json!([
        {"date": "2024-05-20T08:00:00", "location": "Austin, TX", "device": "iphone-15", "ip": "203.0.113.10"},
        {"date": "2024-05-22T19:00:00", "location": "Austin, TX", "device": "iphone-15", "ip": "203.0.113.11"},
    ])
}

/// A complete KYC snapshot collected at [`AS_OF`].
pub fn kyc_snapshot(verification_id: VerificationId, name: &str) -> EvidenceSnapshot {
    let reference = inquiry_reference("U1");
    let signals = serde_json::to_value(id_signals(&reference, name)).unwrap_or(Value::Null);
    EvidenceSnapshot::new(verification_id, Timestamp::new(AS_OF))
        .with(doc::PROFILE, kyc_profile(name))
        .with(doc::INQUIRY_REFERENCE, json!(reference))
        .with(doc::ID_CHECK, signals)
        .with(doc::FRAUD_SIGNALS, fraud_signals_clean())
        .with(doc::BANKING_HISTORY, banking_history_clean())
        .with(doc::LOGIN_HISTORY, login_history_clean())
}

/// Script a subject whose KYC run passes every check.
pub fn script_kyc_subject(
    source: &NullDataSource,
    identity: &NullIdentityProvider,
    subject: &str,
    name: &str,
) {
    let reference = inquiry_reference(subject);
    source.insert(subject, RecordCategory::Profile, kyc_profile(name));
    source.insert(subject, RecordCategory::InquiryReference, json!(reference));
    source.insert(subject, RecordCategory::FraudSignals, fraud_signals_clean());
    source.insert(subject, RecordCategory::BankingHistory, banking_history_clean());
    source.insert(subject, RecordCategory::LoginHistory, login_history_clean());
    identity.register(&reference, id_signals(&reference, name));
}

// ── Provider signal patching ────────────────────────────────────────────

fn provider_checks_mut<'a>(
    raw: &'a mut Value,
    check: &'a str,
) -> impl Iterator<Item = &'a mut Value> + 'a {
    raw.get_mut("verifications")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(|v| v.get_mut("checks").and_then(Value::as_array_mut))
        .flatten()
        .filter(move |c| c.get("name").and_then(Value::as_str) == Some(check))
}

/// Mark every provider check named `check` as failed in a raw `id_check` document.
pub fn fail_provider_check(raw: &mut Value, check: &str) {
    for c in provider_checks_mut(raw, check) {
        c["status"] = json!("failed");
    }
}

/// Set one metadata entry on every provider check named `check`.
pub fn set_provider_metadata(raw: &mut Value, check: &str, key: &str, value: Value) {
    for c in provider_checks_mut(raw, check) {
        c["metadata"][key] = value.clone();
    }
}

/// Fail one provider check in a typed signal set.
pub fn fail_signal(signals: &mut IdSignals, check: &str) {
    for c in signals
        .verifications
        .iter_mut()
        .flat_map(|v| v.checks.iter_mut())
        .filter(|c| c.name == check)
    {
        c.status = "failed".to_string();
    }
}

// ── KYB ─────────────────────────────────────────────────────────────────

pub fn business(name: &str) -> Value {
    json!({
        "business_name": name,
        "business_type": "llc",
        "industry_type": "software",
        "tax_id": "123456789",
        "address": {
            "street": "500 W 2nd St",
            "city": "Austin",
            "state": "TX",
            "postal_code": "78701",
            "country": "United States",
        },
        "tax_id_verified": true,
        "ein_owner_name": name,
        "good_standing": true,
        "sos_filing_status": "active",
        "registered_name": name,
        "incorporation_date": "2020-01-15",
        "last_filing_date": "2024-02-01",
        "legal_structure": "LLC",
        "articles_name": name,
        "ein_letter": {
            "verified": true,
            "ein": "12-3456789",
            "company_name": name,
        },
    })
}

/// Owner list pointing at the given subject ids. The first owner is the director.
pub fn owners(ids: &[&str]) -> Value {
    let share = if ids.is_empty() {
        0.0
    } else {
        100.0 / ids.len() as f64
    };
    Value::Array(
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                json!({
                    "owner_id": id,
                    "name": format!("Owner {id}"),
                    "ownership_percentage": share,
                    "role": if i == 0 { "director" } else { "shareholder" },
                })
            })
            .collect(),
    )
}

/// A complete KYB snapshot collected at [`AS_OF`].
pub fn kyb_snapshot(
    verification_id: VerificationId,
    name: &str,
    owner_ids: &[&str],
) -> EvidenceSnapshot {
    EvidenceSnapshot::new(verification_id, Timestamp::new(AS_OF))
        .with(doc::BUSINESS, business(name))
        .with(doc::BENEFICIAL_OWNERS, owners(owner_ids))
}

/// Script a business and its owner list. Owners themselves are not scripted.
pub fn script_business(source: &NullDataSource, subject: &str, name: &str, owner_ids: &[&str]) {
    source.insert(subject, RecordCategory::Business, business(name));
    source.insert(subject, RecordCategory::BeneficialOwners, owners(owner_ids));
}
