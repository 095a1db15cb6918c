//! Articles of incorporation: on file, legal structure, incorporation age, name.

use veriflow_types::CheckItem;

use super::business;
use crate::docs::{parse_datetime, same_name};
use crate::{AgentContext, AgentError, AgentOutcome};

/// Incorporations younger than this are flagged for review.
pub const VERY_NEW_DAYS: i64 = 30;

/// (business type as submitted, legal structure on the articles)
const STRUCTURES: [(&str, &str); 4] = [
    ("llc", "LLC"),
    ("corporation", "Corporation"),
    ("partnership", "Partnership"),
    ("sole_proprietorship", "Sole Proprietorship"),
];

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let b = business(ctx)?;
    let incorporated = b.incorporation_date.as_deref().and_then(parse_datetime);

    let mut checks = vec![CheckItem::pass_if(
        "Articles Verification",
        incorporated.is_some(),
        format!("Articles of incorporation on file: {}", incorporated.is_some()),
    )];

    let structure = b.legal_structure.trim();
    let known = STRUCTURES
        .iter()
        .any(|(_, s)| s.eq_ignore_ascii_case(structure));
    let consistent = STRUCTURES.iter().any(|(t, s)| {
        t.eq_ignore_ascii_case(b.business_type.trim()) && s.eq_ignore_ascii_case(structure)
    });
    checks.push(CheckItem::pass_if(
        "Legal Structure",
        known && consistent,
        format!(
            "Legal structure: {structure}, business type: {}, consistent: {consistent}",
            b.business_type
        ),
    ));

    checks.push(match incorporated {
        None => CheckItem::failed("Incorporation Date", "Incorporation date not available"),
        Some(at) => {
            let age = (ctx.as_of() - at).num_days();
            let details = format!("Incorporated {age} days before collection");
            if age < VERY_NEW_DAYS {
                CheckItem::warning("Incorporation Date", details)
            } else {
                CheckItem::passed("Incorporation Date", details)
            }
        }
    });

    checks.push(match &b.articles_name {
        None => CheckItem::not_applicable(
            "Business Name Consistency",
            "No name extracted from the articles",
        ),
        Some(name) => CheckItem::pass_if(
            "Business Name Consistency",
            same_name(name, &b.business_name),
            format!("Articles: {name}, submitted: {}", b.business_name),
        ),
    });

    Ok(AgentOutcome::new(checks))
}
