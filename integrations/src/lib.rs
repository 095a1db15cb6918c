//! External collaborators for Veriflow.
//!
//! Every outside service the engine talks to sits behind an object-safe async trait:
//! the read-only [`DataSource`], the [`IdentityProvider`], the live [`FraudScorer`]
//! and the optional [`Summarizer`]. Production wiring uses the reqwest clients in
//! [`http`]; tests use the doubles in `veriflow-nullables`.
//!
//! The traits are bundled once at start-up into [`Integrations`] and handed to the
//! engine by `Arc`.

pub mod error;
pub mod fraud;
pub mod http;
pub mod identity;
pub mod retry;
pub mod source;
pub mod summary;

use std::sync::Arc;
use std::time::Duration;

pub use error::ExternalError;
pub use fraud::FraudScorer;
pub use identity::{IdSignals, IdentityProvider, ProviderCheck, ProviderVerification};
pub use retry::RetryPolicy;
pub use source::{DataSource, RecordCategory};
pub use summary::Summarizer;

/// The collaborator set, built once and shared by every workflow.
#[derive(Clone)]
pub struct Integrations {
    pub data_source: Arc<dyn DataSource>,
    pub identity: Arc<dyn IdentityProvider>,
    pub fraud: Arc<dyn FraudScorer>,
    /// `None` when no summary service is configured; the compiler falls back to a
    /// templated summary.
    pub summarizer: Option<Arc<dyn Summarizer>>,
}

impl Integrations {
    pub fn new(
        data_source: Arc<dyn DataSource>,
        identity: Arc<dyn IdentityProvider>,
        fraud: Arc<dyn FraudScorer>,
    ) -> Self {
        Self {
            data_source,
            identity,
            fraud,
            summarizer: None,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Wire the HTTP clients against the given base URLs.
    pub fn http(
        data_source_url: &str,
        identity_url: &str,
        fraud_url: &str,
        summarizer_url: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let integrations = Self::new(
            Arc::new(http::HttpDataSource::new(data_source_url, timeout)),
            Arc::new(http::HttpIdentityProvider::new(identity_url, timeout)),
            Arc::new(http::HttpFraudScorer::new(fraud_url, timeout)),
        );
        match summarizer_url {
            Some(url) => {
                integrations.with_summarizer(Arc::new(http::HttpSummarizer::new(url, timeout)))
            }
            None => integrations,
        }
    }
}
