//! Typed views over raw evidence documents.
//!
//! Every field is defaulted: providers omit whatever they do not know, and an agent
//! treats an empty field as "no signal" rather than as a decoding error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.state, &self.postal_code]
            .iter()
            .all(|f| !f.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DriversLicense {
    pub number: String,
    pub state: String,
    pub status: String,
}

/// `profile` document (KYC).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub identity_verified: bool,
    pub address: Address,
    pub drivers_license: Option<DriversLicense>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Transaction {
    pub amount: f64,
    pub date: String,
}

/// One entry of the `banking_history` document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BankAccount {
    pub verified: bool,
    pub transactions: Vec<Transaction>,
}

/// One entry of the `login_history` document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginEvent {
    pub date: String,
    pub location: String,
    pub device: String,
    pub ip: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FraudScores {
    pub payment_abuse: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FraudNetwork {
    pub risk_score: f64,
    pub associated_users: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
}

/// `fraud_signals` document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FraudSignals {
    pub scores: FraudScores,
    pub network: FraudNetwork,
    pub activities: Vec<Activity>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EinLetter {
    pub verified: bool,
    pub ein: String,
    pub company_name: String,
}

/// `business` document (KYB), merged with registry data by the data source.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Business {
    pub business_name: String,
    pub business_type: String,
    pub industry_type: String,
    pub tax_id: String,
    pub address: Address,
    pub tax_id_verified: bool,
    pub ein_owner_name: String,
    pub good_standing: bool,
    pub sos_filing_status: String,
    pub registered_name: Option<String>,
    pub incorporation_date: Option<String>,
    pub last_filing_date: Option<String>,
    pub legal_structure: String,
    pub articles_name: Option<String>,
    pub ein_letter: Option<EinLetter>,
}

/// Parse the date formats providers use: RFC 3339, naive ISO date-time, or a bare date.
/// Naive values are taken as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Case- and whitespace-insensitive equality. Two empty strings are not a match.
pub fn same_name(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
}
