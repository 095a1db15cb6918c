//! Mandatory vs advisory classification.
//!
//! A failed **mandatory** result fails the whole verification; a failed **advisory**
//! result only downgrades it to a warning. The table is configuration: every agent
//! has a built-in default, and overrides are read from the engine config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use veriflow_types::AgentKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Mandatory,
    Advisory,
}

impl Requirement {
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::Mandatory)
    }
}

/// Built-in classification for each agent.
pub fn default_requirement(kind: AgentKind) -> Requirement {
    match kind {
        AgentKind::InitialDiligence
        | AgentKind::GovtId
        | AgentKind::IdSelfie
        | AgentKind::FraudScore
        | AgentKind::IdCheck
        | AgentKind::Ofac
        | AgentKind::NormalDiligence
        | AgentKind::IrsMatch
        | AgentKind::SosFilings => Requirement::Mandatory,
        AgentKind::Aamva
        | AgentKind::EmailPhoneIp
        | AgentKind::PaymentBehavior
        | AgentKind::LoginActivities
        | AgentKind::EinLetter
        | AgentKind::ArticlesOfIncorporation => Requirement::Advisory,
    }
}

/// How much a beneficial owner's verdict weighs on the parent business.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UboPolicy {
    #[serde(default = "default_ubo_requirement")]
    pub default: Requirement,
    /// Overrides keyed by owner role, compared case-insensitively.
    #[serde(default)]
    pub by_role: BTreeMap<String, Requirement>,
}

fn default_ubo_requirement() -> Requirement {
    Requirement::Mandatory
}

impl Default for UboPolicy {
    fn default() -> Self {
        Self {
            default: default_ubo_requirement(),
            by_role: BTreeMap::new(),
        }
    }
}

impl UboPolicy {
    pub fn requirement(&self, role: Option<&str>) -> Requirement {
        role.and_then(|r| {
            self.by_role
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(r))
                .map(|(_, v)| *v)
        })
        .unwrap_or(self.default)
    }
}

/// The full policy table: per-agent overrides plus the UBO policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    /// Overrides keyed by agent tag (`govt_id`, `aamva`, ...).
    #[serde(default)]
    pub agents: BTreeMap<String, Requirement>,
    #[serde(default)]
    pub ubo: UboPolicy,
}

impl PolicyTable {
    pub fn requirement(&self, kind: AgentKind) -> Requirement {
        self.agents
            .get(kind.as_str())
            .copied()
            .unwrap_or_else(|| default_requirement(kind))
    }

    pub fn with_override(mut self, kind: AgentKind, requirement: Requirement) -> Self {
        self.agents.insert(kind.as_str().to_string(), requirement);
        self
    }

    /// Override keys that do not name a known agent.
    pub fn unknown_agents(&self) -> Vec<&str> {
        self.agents
            .keys()
            .filter(|k| k.parse::<AgentKind>().is_err())
            .map(String::as_str)
            .collect()
    }
}
