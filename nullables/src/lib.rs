//! Nullable collaborators for deterministic testing.
//!
//! Every external dependency of the engine (clock, data source, identity
//! provider, fraud scorer, summarizer) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return scripted values
//! - Can fail, stall or recover on command
//! - Never touch the network
//!
//! [`fixtures`] builds evidence on which every agent passes.

pub mod clock;
pub mod data_source;
pub mod fixtures;
pub mod services;

use std::sync::Arc;

use veriflow_integrations::Integrations;

pub use clock::NullClock;
pub use data_source::NullDataSource;
pub use services::{NullFraudScorer, NullIdentityProvider, NullSummarizer};

/// Handles on every nullable collaborator, so a test can script them after wiring.
pub struct NullCollaborators {
    pub data_source: Arc<NullDataSource>,
    pub identity: Arc<NullIdentityProvider>,
    pub fraud: Arc<NullFraudScorer>,
    pub summarizer: Option<Arc<NullSummarizer>>,
}

impl NullCollaborators {
    /// Empty data source, passing identity provider, low fraud score, no summarizer.
    pub fn new() -> Self {
        Self {
            data_source: Arc::new(NullDataSource::new()),
            identity: Arc::new(NullIdentityProvider::passing()),
            fraud: Arc::new(NullFraudScorer::new(10.0)),
            summarizer: None,
        }
    }

    pub fn with_fraud(mut self, fraud: NullFraudScorer) -> Self {
        self.fraud = Arc::new(fraud);
        self
    }

    pub fn with_summarizer(mut self, summarizer: NullSummarizer) -> Self {
        self.summarizer = Some(Arc::new(summarizer));
        self
    }

    /// Script a KYC subject that passes every check.
    pub fn passing_subject(&self, subject: &str, name: &str) {
        fixtures::script_kyc_subject(&self.data_source, &self.identity, subject, name);
    }

    /// Script a business whose own checks pass, with the given owners.
    pub fn business(&self, subject: &str, name: &str, owner_ids: &[&str]) {
        fixtures::script_business(&self.data_source, subject, name, owner_ids);
    }

    pub fn integrations(&self) -> Integrations {
        let integrations = Integrations::new(
            self.data_source.clone(),
            self.identity.clone(),
            self.fraud.clone(),
        );
        match &self.summarizer {
            Some(s) => integrations.with_summarizer(s.clone()),
            None => integrations,
        }
    }
}

impl Default for NullCollaborators {
    fn default() -> Self {
        Self::new()
    }
}
