//! Verification agents.
//!
//! Each agent is an independent check over one immutable [`EvidenceSnapshot`]
//! producing exactly one [`CheckResult`]. The set is closed ([`AgentKind`]) and the
//! per-type registry is a static table ([`roster`]). Dispatch is a single exhaustive
//! `match`, so an agent cannot be added without being wired here.
//!
//! Agents never abort their siblings: [`evaluate`] turns any [`AgentError`] into a
//! failed result. Timeouts and panics are handled one level up by the scheduler.
//!
//! [`EvidenceSnapshot`]: veriflow_types::EvidenceSnapshot

pub mod context;
pub mod docs;
pub mod error;
pub mod kyb;
pub mod kyc;
pub mod lists;
pub mod policy;
pub mod roster;

use tracing::warn;

use veriflow_types::{AgentKind, CheckResult, Clock};

pub use context::{AgentContext, AgentOutcome};
pub use error::AgentError;
pub use policy::{PolicyTable, Requirement, UboPolicy};
pub use roster::roster;

/// Run one agent and return its raw outcome.
pub async fn run_agent(kind: AgentKind, ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    match kind {
        AgentKind::InitialDiligence => kyc::initial_diligence::evaluate(ctx),
        AgentKind::GovtId => kyc::govt_id::evaluate(ctx),
        AgentKind::IdSelfie => kyc::id_selfie::evaluate(ctx),
        AgentKind::Aamva => kyc::aamva::evaluate(ctx),
        AgentKind::EmailPhoneIp => kyc::email_phone_ip::evaluate(ctx),
        AgentKind::PaymentBehavior => kyc::payment_behavior::evaluate(ctx),
        AgentKind::LoginActivities => kyc::login_activities::evaluate(ctx),
        AgentKind::FraudScore => kyc::fraud_score::run(ctx).await,
        AgentKind::IdCheck => kyc::id_check::evaluate(ctx),
        AgentKind::Ofac => kyc::ofac::evaluate(ctx),
        AgentKind::NormalDiligence => kyb::normal_diligence::evaluate(ctx),
        AgentKind::IrsMatch => kyb::irs_match::evaluate(ctx),
        AgentKind::SosFilings => kyb::sos_filings::evaluate(ctx),
        AgentKind::EinLetter => kyb::ein_letter::evaluate(ctx),
        AgentKind::ArticlesOfIncorporation => kyb::articles_of_incorporation::evaluate(ctx),
    }
}

/// Run one agent and stamp its result with the clock's time on completion. An
/// agent error becomes a failed result tagged `agent_error`.
pub async fn evaluate(kind: AgentKind, ctx: &AgentContext, clock: &dyn Clock) -> CheckResult {
    let outcome = run_agent(kind, ctx).await;
    let produced_at = clock.now();
    match outcome {
        Ok(outcome) => outcome.into_result(ctx.verification_id.clone(), kind, produced_at),
        Err(e) => {
            warn!(agent = %kind, verification_id = %ctx.verification_id, error = %e, "agent failed");
            CheckResult::failure(
                ctx.verification_id.clone(),
                kind,
                "agent_error",
                e.to_string(),
                produced_at,
            )
        }
    }
}
