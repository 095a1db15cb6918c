//! Identity provider: document, selfie and watchlist signals for a prior inquiry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ExternalError;

/// Well-known verification kinds reported by the provider.
pub mod verification_kind {
    pub const GOVERNMENT_ID: &str = "government_id";
    pub const WATCHLIST: &str = "watchlist";
    pub const GEOLOCATION: &str = "geolocation";
}

/// One named check inside a provider verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderCheck {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// One verification (government id, watchlist, ...) the provider ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderVerification {
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub checks: Vec<ProviderCheck>,
    /// Extracted document attributes, e.g. the name printed on the id.
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ProviderVerification {
    pub fn check(&self, name: &str) -> Option<&ProviderCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Everything the provider reported for one inquiry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdSignals {
    pub inquiry_reference: String,
    #[serde(default)]
    pub verifications: Vec<ProviderVerification>,
}

impl IdSignals {
    pub fn verification(&self, kind: &str) -> Option<&ProviderVerification> {
        self.verifications.iter().find(|v| v.kind == kind)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn check_id(&self, inquiry_reference: &str) -> Result<IdSignals, ExternalError>;
}
