//! Initial diligence: database identity, PEP and OFAC watchlists, banned geographies.

use veriflow_integrations::identity::verification_kind;
use veriflow_types::{CheckItem, CheckStatus};

use super::{profile, provider_status, signals};
use crate::{AgentContext, AgentError, AgentOutcome};

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let profile = profile(ctx)?;
    let signals = signals(ctx)?;
    let watchlist = signals
        .as_ref()
        .and_then(|s| s.verification(verification_kind::WATCHLIST));

    let mut checks = vec![CheckItem::pass_if(
        "Identity Verification",
        profile.identity_verified,
        if profile.identity_verified {
            "Identity verified in database"
        } else {
            "Identity not verified"
        },
    )];

    let pep = provider_status(watchlist, "watchlist_pep_detection");
    checks.push(CheckItem::new(
        "Watchlist (PEP)",
        pep,
        format!("PEP check result: {pep}"),
    ));

    let ofac = provider_status(watchlist, "watchlist_ofac_detection");
    checks.push(CheckItem::new(
        "Watchlist (OFAC)",
        ofac,
        format!("OFAC check result: {ofac}"),
    ));

    let geo = signals
        .as_ref()
        .and_then(|s| s.verification(verification_kind::GEOLOCATION))
        .map(|v| CheckStatus::from_provider(&v.status))
        .unwrap_or(CheckStatus::NotApplicable);
    checks.push(CheckItem::new(
        "Banned Geographies",
        geo,
        format!("Geography check result: {geo}"),
    ));

    Ok(AgentOutcome::new(checks))
}
