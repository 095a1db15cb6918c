//! Static per-type agent registry.

use veriflow_types::{AgentKind, VerificationType};

const KYC_ROSTER: [AgentKind; 10] = [
    AgentKind::InitialDiligence,
    AgentKind::GovtId,
    AgentKind::IdSelfie,
    AgentKind::Aamva,
    AgentKind::EmailPhoneIp,
    AgentKind::PaymentBehavior,
    AgentKind::LoginActivities,
    AgentKind::FraudScore,
    AgentKind::IdCheck,
    AgentKind::Ofac,
];

const KYB_ROSTER: [AgentKind; 5] = [
    AgentKind::NormalDiligence,
    AgentKind::IrsMatch,
    AgentKind::SosFilings,
    AgentKind::EinLetter,
    AgentKind::ArticlesOfIncorporation,
];

/// Every agent that runs for a verification of this type.
pub fn roster(verification_type: VerificationType) -> &'static [AgentKind] {
    match verification_type {
        VerificationType::Kyc => &KYC_ROSTER,
        VerificationType::Kyb => &KYB_ROSTER,
    }
}
