//! Login activity: impossible travel, device sprawl, suspicious IPs, failed logins.

use chrono::Duration;
use std::collections::HashSet;
use std::net::IpAddr;

use veriflow_types::evidence::doc;
use veriflow_types::CheckItem;

use crate::docs::{parse_datetime, FraudSignals, LoginEvent};
use crate::{AgentContext, AgentError, AgentOutcome};

/// Logins from different locations closer than this are impossible travel.
pub const TRAVEL_WINDOW_HOURS: i64 = 2;
pub const MAX_DEVICES: usize = 5;
pub const MAX_FAILED_LOGINS: usize = 3;

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let logins: Option<Vec<LoginEvent>> = ctx.document(doc::LOGIN_HISTORY)?;
    let signals: Option<FraudSignals> = ctx.document(doc::FRAUD_SIGNALS)?;

    let mut checks = Vec::with_capacity(4);

    match &logins {
        None => {
            for name in ["Login Location Analysis", "Device Analysis", "IP Analysis"] {
                checks.push(CheckItem::not_applicable(name, "No login history on file"));
            }
        }
        Some(logins) => {
            let travel = impossible_travel(logins);
            checks.push(CheckItem::pass_if(
                "Login Location Analysis",
                !travel,
                format!("Impossible travel detected: {travel}"),
            ));

            let devices: HashSet<&str> = logins
                .iter()
                .map(|l| l.device.trim())
                .filter(|d| !d.is_empty())
                .collect();
            checks.push(CheckItem::pass_if(
                "Device Analysis",
                devices.len() <= MAX_DEVICES,
                format!("Unique devices: {}", devices.len()),
            ));

            let suspicious = logins
                .iter()
                .map(|l| l.ip.trim())
                .filter(|ip| !ip.is_empty())
                .filter(|ip| ip.parse::<IpAddr>().map_or(true, is_private))
                .count();
            checks.push(CheckItem::pass_if(
                "IP Analysis",
                suspicious == 0,
                format!("Suspicious IPs: {suspicious}"),
            ));
        }
    }

    checks.push(match &signals {
        None => CheckItem::not_applicable("Login Failure Analysis", "No fraud signals on file"),
        Some(s) => {
            let failed = s
                .activities
                .iter()
                .filter(|a| a.kind == "login" && a.status != "success")
                .count();
            CheckItem::pass_if(
                "Login Failure Analysis",
                failed <= MAX_FAILED_LOGINS,
                format!("Failed login attempts: {failed}"),
            )
        }
    });

    Ok(AgentOutcome::new(checks))
}

fn impossible_travel(logins: &[LoginEvent]) -> bool {
    let mut dated: Vec<_> = logins
        .iter()
        .filter_map(|l| parse_datetime(&l.date).map(|at| (at, l.location.trim())))
        .collect();
    dated.sort_by_key(|(at, _)| *at);
    dated.windows(2).any(|w| {
        w[0].1 != w[1].1 && w[1].0 - w[0].0 < Duration::hours(TRAVEL_WINDOW_HOURS)
    })
}

fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}
