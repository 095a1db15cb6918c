//! Optional reasoning service that turns results into prose.

use async_trait::async_trait;

use veriflow_types::{CheckResult, UboReference};

use crate::ExternalError;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        results: &[CheckResult],
        ubos: &[UboReference],
    ) -> Result<String, ExternalError>;
}
