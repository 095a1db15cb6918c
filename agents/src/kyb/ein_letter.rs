//! EIN letter: the IRS assignment letter on file matches the business.

use veriflow_types::CheckItem;

use super::{business, is_valid_tax_id, normalize_tax_id};
use crate::{AgentContext, AgentError, AgentOutcome};

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let b = business(ctx)?;

    let Some(letter) = &b.ein_letter else {
        return Ok(AgentOutcome::new(vec![
            CheckItem::failed("EIN Letter Verified", "No EIN letter on file"),
            CheckItem::not_applicable("EIN Number Verification", "No EIN letter on file"),
            CheckItem::not_applicable("Company Name Verification", "No EIN letter on file"),
        ]));
    };

    let ein_ok = is_valid_tax_id(&letter.ein)
        && normalize_tax_id(&letter.ein) == normalize_tax_id(&b.tax_id);

    let letter_name = letter.company_name.trim().to_ascii_lowercase();
    let business_name = b.business_name.trim().to_ascii_lowercase();
    let name_ok = !letter_name.is_empty()
        && !business_name.is_empty()
        && (letter_name.contains(&business_name) || business_name.contains(&letter_name));

    Ok(AgentOutcome::new(vec![
        CheckItem::pass_if(
            "EIN Letter Verified",
            letter.verified,
            format!("Letter verified: {}", letter.verified),
        ),
        CheckItem::pass_if(
            "EIN Number Verification",
            ein_ok,
            format!("Letter EIN: {}, provided EIN: {}", letter.ein, b.tax_id),
        ),
        CheckItem::pass_if(
            "Company Name Verification",
            name_ok,
            format!(
                "Letter name: {}, business name: {}",
                letter.company_name, b.business_name
            ),
        ),
    ]))
}
