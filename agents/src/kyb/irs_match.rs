//! IRS match: tax id format, IRS record, EIN owner name, filing standing.

use veriflow_types::CheckItem;

use super::{business, is_valid_tax_id};
use crate::docs::same_name;
use crate::{AgentContext, AgentError, AgentOutcome};

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let b = business(ctx)?;

    let format_ok = is_valid_tax_id(&b.tax_id);
    let name_match = same_name(&b.business_name, &b.ein_owner_name);

    Ok(AgentOutcome::new(vec![
        CheckItem::pass_if(
            "Tax ID Format Validation",
            format_ok,
            format!(
                "Tax ID format is {}: {}",
                if format_ok { "valid" } else { "invalid" },
                b.tax_id
            ),
        ),
        CheckItem::pass_if(
            "IRS Database Match",
            b.tax_id_verified,
            format!("Tax ID verified with IRS: {}", b.tax_id_verified),
        ),
        CheckItem::pass_if(
            "Business Name Match",
            name_match,
            format!(
                "Submitted: {}, IRS: {}",
                b.business_name, b.ein_owner_name
            ),
        ),
        CheckItem::pass_if(
            "Tax Filing Status",
            b.good_standing,
            format!("Good standing with IRS: {}", b.good_standing),
        ),
    ]))
}
