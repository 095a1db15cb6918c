//! KYC agents: checks on an individual.

pub mod aamva;
pub mod email_phone_ip;
pub mod fraud_score;
pub mod govt_id;
pub mod id_check;
pub mod id_selfie;
pub mod initial_diligence;
pub mod login_activities;
pub mod ofac;
pub mod payment_behavior;

use veriflow_integrations::{IdSignals, ProviderVerification};
use veriflow_types::evidence::doc;
use veriflow_types::CheckStatus;

use crate::docs::Profile;
use crate::{AgentContext, AgentError};

pub(crate) fn profile(ctx: &AgentContext) -> Result<Profile, AgentError> {
    ctx.required(doc::PROFILE)
}

/// Identity provider signals, if an inquiry existed.
pub(crate) fn signals(ctx: &AgentContext) -> Result<Option<IdSignals>, AgentError> {
    ctx.document(doc::ID_CHECK)
}

/// Status of one provider check; absent verification or check is `not_applicable`.
pub(crate) fn provider_status(
    verification: Option<&ProviderVerification>,
    check: &str,
) -> CheckStatus {
    verification
        .and_then(|v| v.check(check))
        .map(|c| CheckStatus::from_provider(&c.status))
        .unwrap_or(CheckStatus::NotApplicable)
}
