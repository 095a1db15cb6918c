//! Email domain, phone format and login IP sanity.

use std::net::IpAddr;

use veriflow_types::evidence::doc;
use veriflow_types::CheckItem;

use super::profile;
use crate::docs::LoginEvent;
use crate::lists::{contains_ignore_case, DISPOSABLE_EMAIL_DOMAINS};
use crate::{AgentContext, AgentError, AgentOutcome};

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let profile = profile(ctx)?;
    let logins: Option<Vec<LoginEvent>> = ctx.document(doc::LOGIN_HISTORY)?;

    let mut checks = Vec::with_capacity(3);

    checks.push(match profile.email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let disposable = contains_ignore_case(DISPOSABLE_EMAIL_DOMAINS, domain);
            CheckItem::pass_if(
                "Email Verification",
                !disposable,
                if disposable {
                    format!("Disposable email domain: {domain}")
                } else {
                    format!("Email domain verified: {domain}")
                },
            )
        }
        _ => CheckItem::failed(
            "Email Verification",
            format!("Invalid email address: {:?}", profile.email),
        ),
    });

    let phone = profile.phone.trim();
    let phone_ok = phone.starts_with('+') && phone.len() > 10;
    checks.push(CheckItem::pass_if(
        "Phone Verification",
        phone_ok,
        if phone_ok {
            format!("Phone number verified: {phone}")
        } else {
            format!("Invalid phone number format: {phone}")
        },
    ));

    let ips: Vec<&str> = logins
        .iter()
        .flatten()
        .map(|l| l.ip.trim())
        .filter(|ip| !ip.is_empty())
        .collect();
    if ips.is_empty() {
        checks.push(CheckItem::not_applicable(
            "IP Verification",
            "No login IPs on file",
        ));
    } else {
        let invalid: Vec<&str> = ips
            .iter()
            .copied()
            .filter(|ip| ip.parse::<IpAddr>().is_err())
            .collect();
        checks.push(CheckItem::pass_if(
            "IP Verification",
            invalid.is_empty(),
            format!("IPs checked: {}, invalid: {}", ips.len(), invalid.len()),
        ));
    }

    Ok(AgentOutcome::new(checks))
}
