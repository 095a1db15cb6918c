//! Secretary of State filings: registration, name, business age, recent filings.

use veriflow_types::CheckItem;

use super::business;
use crate::docs::{parse_datetime, same_name};
use crate::{AgentContext, AgentError, AgentOutcome};

/// Businesses younger than this are flagged for review.
pub const NEW_BUSINESS_DAYS: i64 = 180;
/// The last filing must be more recent than this.
pub const FILING_WINDOW_DAYS: i64 = 365;

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let b = business(ctx)?;
    let now = ctx.as_of();

    let active = b.sos_filing_status.eq_ignore_ascii_case("active");
    let mut checks = vec![CheckItem::pass_if(
        "SoS Registration",
        active,
        format!("SoS filing status: {}", b.sos_filing_status),
    )];

    checks.push(match &b.registered_name {
        None => CheckItem::not_applicable(
            "Business Name Consistency",
            "No registered name on file",
        ),
        Some(registered) => CheckItem::pass_if(
            "Business Name Consistency",
            same_name(registered, &b.business_name),
            format!("Registered: {registered}, submitted: {}", b.business_name),
        ),
    });

    checks.push(
        match b.incorporation_date.as_deref().and_then(parse_datetime) {
            None => CheckItem::failed("Business Age", "Incorporation date not available"),
            Some(incorporated) => {
                let age = (now - incorporated).num_days();
                let details = format!("Business age: {age} days");
                if age < NEW_BUSINESS_DAYS {
                    CheckItem::warning("Business Age", details)
                } else {
                    CheckItem::passed("Business Age", details)
                }
            }
        },
    );

    checks.push(match b.last_filing_date.as_deref().and_then(parse_datetime) {
        None => CheckItem::failed("Recent Filings", "Last filing date not available"),
        Some(filed) => {
            let days = (now - filed).num_days();
            CheckItem::pass_if(
                "Recent Filings",
                days < FILING_WINDOW_DAYS,
                format!("Days since last filing: {days}"),
            )
        }
    });

    Ok(AgentOutcome::new(checks))
}
