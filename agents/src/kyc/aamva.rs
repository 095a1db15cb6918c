//! AAMVA: driver's licence record against the profile address.

use veriflow_types::CheckItem;

use super::profile;
use crate::{AgentContext, AgentError, AgentOutcome};

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let profile = profile(ctx)?;

    let address_ok = profile.address.is_complete();
    let mut checks = vec![CheckItem::pass_if(
        "Address Completeness",
        address_ok,
        if address_ok {
            "Street, city, state and postal code on file"
        } else {
            "Address is incomplete"
        },
    )];

    match &profile.drivers_license {
        None => {
            checks.push(CheckItem::not_applicable(
                "License Record",
                "No driver's license on file",
            ));
            checks.push(CheckItem::not_applicable(
                "License State Match",
                "No driver's license on file",
            ));
        }
        Some(license) => {
            let valid =
                !license.number.trim().is_empty() && license.status.eq_ignore_ascii_case("valid");
            checks.push(CheckItem::pass_if(
                "License Record",
                valid,
                format!("License status: {}", license.status),
            ));
            let state_match = !license.state.trim().is_empty()
                && license
                    .state
                    .trim()
                    .eq_ignore_ascii_case(profile.address.state.trim());
            checks.push(CheckItem::pass_if(
                "License State Match",
                state_match,
                format!(
                    "License state: {}, address state: {}",
                    license.state, profile.address.state
                ),
            ));
        }
    }

    Ok(AgentOutcome::new(checks))
}
