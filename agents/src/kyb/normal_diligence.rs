//! Normal diligence: business type, industry, ownership disclosure, geography.

use veriflow_types::CheckItem;

use super::business;
use crate::lists::{
    contains_ignore_case, BANNED_BUSINESS_TYPES, BANNED_INDUSTRIES, SANCTIONED_COUNTRIES,
};
use crate::{AgentContext, AgentError, AgentOutcome};

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let business = business(ctx)?;
    let owners = ctx.evidence.beneficial_owners()?;

    let mut checks = Vec::with_capacity(4);

    checks.push(if business.business_type.trim().is_empty() {
        CheckItem::failed("Business Type", "Business type not reported")
    } else {
        let banned = contains_ignore_case(BANNED_BUSINESS_TYPES, &business.business_type);
        CheckItem::pass_if(
            "Business Type",
            !banned,
            format!("Business type: {}, banned: {banned}", business.business_type),
        )
    });

    let banned_industry = contains_ignore_case(BANNED_INDUSTRIES, &business.industry_type);
    checks.push(CheckItem::pass_if(
        "Industry Type",
        !banned_industry,
        format!(
            "Industry: {}, banned: {banned_industry}",
            business.industry_type
        ),
    ));

    checks.push(if owners.is_empty() {
        CheckItem::warning("Ownership Information", "No beneficial owners on record")
    } else {
        CheckItem::passed(
            "Ownership Information",
            format!("Beneficial owners on record: {}", owners.len()),
        )
    });

    let country = business.address.country.trim();
    let banned_country = contains_ignore_case(SANCTIONED_COUNTRIES, country);
    checks.push(CheckItem::pass_if(
        "Banned Geographies",
        !banned_country,
        format!("Business country: {country}, banned: {banned_country}"),
    ));

    Ok(AgentOutcome::new(checks))
}
