//! Verification types and the closed set of agent tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// What kind of subject is being verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    /// Know Your Customer: an individual.
    Kyc,
    /// Know Your Business: a business entity and its beneficial owners.
    Kyb,
}

impl VerificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kyc => "kyc",
            Self::Kyb => "kyb",
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kyc" => Ok(Self::Kyc),
            "kyb" => Ok(Self::Kyb),
            other => Err(TypesError::UnknownVerificationType(other.to_string())),
        }
    }
}

/// Tag of a verification agent.
///
/// The set is closed: adding an agent means adding a variant here, which forces every
/// exhaustive `match` (roster, dispatch, policy defaults) to account for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    // ── KYC ─────────────────────────────────────────────────────────────
    InitialDiligence,
    GovtId,
    IdSelfie,
    Aamva,
    EmailPhoneIp,
    PaymentBehavior,
    LoginActivities,
    FraudScore,
    IdCheck,
    Ofac,

    // ── KYB ─────────────────────────────────────────────────────────────
    NormalDiligence,
    IrsMatch,
    SosFilings,
    EinLetter,
    ArticlesOfIncorporation,
}

impl AgentKind {
    /// Every agent kind, KYC first.
    pub const ALL: [AgentKind; 15] = [
        Self::InitialDiligence,
        Self::GovtId,
        Self::IdSelfie,
        Self::Aamva,
        Self::EmailPhoneIp,
        Self::PaymentBehavior,
        Self::LoginActivities,
        Self::FraudScore,
        Self::IdCheck,
        Self::Ofac,
        Self::NormalDiligence,
        Self::IrsMatch,
        Self::SosFilings,
        Self::EinLetter,
        Self::ArticlesOfIncorporation,
    ];

    /// Stable machine tag (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialDiligence => "initial_diligence",
            Self::GovtId => "govt_id",
            Self::IdSelfie => "id_selfie",
            Self::Aamva => "aamva",
            Self::EmailPhoneIp => "email_phone_ip",
            Self::PaymentBehavior => "payment_behavior",
            Self::LoginActivities => "login_activities",
            Self::FraudScore => "fraud_score",
            Self::IdCheck => "id_check",
            Self::Ofac => "ofac",
            Self::NormalDiligence => "normal_diligence",
            Self::IrsMatch => "irs_match",
            Self::SosFilings => "sos_filings",
            Self::EinLetter => "ein_letter",
            Self::ArticlesOfIncorporation => "articles_of_incorporation",
        }
    }

    /// Human-readable check name used on `CheckResult::check_name`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::InitialDiligence => "Initial Diligence",
            Self::GovtId => "Government ID Verification",
            Self::IdSelfie => "ID Selfie Verification",
            Self::Aamva => "AAMVA Verification",
            Self::EmailPhoneIp => "Email, Phone and IP Verification",
            Self::PaymentBehavior => "Payment Behavior",
            Self::LoginActivities => "Login Activities",
            Self::FraudScore => "Fraud Score",
            Self::IdCheck => "ID Document Check",
            Self::Ofac => "OFAC Sanctions Screening",
            Self::NormalDiligence => "Normal Diligence",
            Self::IrsMatch => "IRS Match",
            Self::SosFilings => "Secretary of State Filings",
            Self::EinLetter => "EIN Letter",
            Self::ArticlesOfIncorporation => "Articles of Incorporation",
        }
    }

    /// The verification type this agent belongs to.
    pub fn verification_type(&self) -> VerificationType {
        match self {
            Self::InitialDiligence
            | Self::GovtId
            | Self::IdSelfie
            | Self::Aamva
            | Self::EmailPhoneIp
            | Self::PaymentBehavior
            | Self::LoginActivities
            | Self::FraudScore
            | Self::IdCheck
            | Self::Ofac => VerificationType::Kyc,
            Self::NormalDiligence
            | Self::IrsMatch
            | Self::SosFilings
            | Self::EinLetter
            | Self::ArticlesOfIncorporation => VerificationType::Kyb,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TypesError::UnknownAgentKind(s.to_string()))
    }
}
