//! Live fraud scoring.

use async_trait::async_trait;

use veriflow_types::SubjectId;

use crate::ExternalError;

#[async_trait]
pub trait FraudScorer: Send + Sync {
    /// Risk score in `0..=100`; higher is riskier.
    async fn score(&self, subject: &SubjectId) -> Result<f64, ExternalError>;
}
