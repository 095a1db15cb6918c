//! OFAC sanctions screening.

use veriflow_integrations::identity::verification_kind;
use veriflow_types::{CheckItem, CheckStatus};

use super::{profile, provider_status, signals};
use crate::lists::{contains_ignore_case, SANCTIONED_COUNTRIES};
use crate::{AgentContext, AgentError, AgentOutcome};

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let profile = profile(ctx)?;
    let signals = signals(ctx)?;
    let watchlist = signals
        .as_ref()
        .and_then(|s| s.verification(verification_kind::WATCHLIST));

    // The provider screens SDN and consolidated lists in one pass.
    let ofac = provider_status(watchlist, "watchlist_ofac_detection");
    let similarity = match provider_status(watchlist, "watchlist_name_similarity") {
        CheckStatus::NotApplicable => ofac,
        s => s,
    };
    let country = profile.address.country.trim();
    let sanctioned = contains_ignore_case(SANCTIONED_COUNTRIES, country);

    Ok(AgentOutcome::new(vec![
        CheckItem::new("OFAC SDN List", ofac, format!("SDN list check result: {ofac}")),
        CheckItem::new(
            "OFAC Consolidated List",
            ofac,
            format!("Consolidated list check result: {ofac}"),
        ),
        CheckItem::pass_if(
            "Country Sanctions",
            !sanctioned,
            format!("Country: {country}, sanctioned: {sanctioned}"),
        ),
        CheckItem::new(
            "Name Similarity",
            similarity,
            format!("Name similarity check result: {similarity}"),
        ),
    ]))
}
