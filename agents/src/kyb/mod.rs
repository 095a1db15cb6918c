//! KYB agents: checks on a business entity.

pub mod articles_of_incorporation;
pub mod ein_letter;
pub mod irs_match;
pub mod normal_diligence;
pub mod sos_filings;

use veriflow_types::evidence::doc;

use crate::docs::Business;
use crate::{AgentContext, AgentError};

pub(crate) fn business(ctx: &AgentContext) -> Result<Business, AgentError> {
    ctx.required(doc::BUSINESS)
}

/// Strip separators from a tax id so `12-3456789` and `123456789` compare equal.
pub(crate) fn normalize_tax_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub(crate) fn is_valid_tax_id(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '-')
        && normalize_tax_id(trimmed).len() == 9
}
