//! HTTP clients for the external collaborators.
//!
//! All four speak JSON over plain REST:
//!
//! - data source: `GET {base}/subjects/{subject}/{category}`
//! - identity provider: `GET {base}/inquiries/{reference}`
//! - fraud scorer: `GET {base}/scores/{subject}` returning `{"score": f64}`
//! - summarizer: `POST {base}/summaries` returning `{"summary": "..."}`
//!
//! Status mapping: 404 is "not found"; 408, 429, 5xx, timeouts and connection
//! failures are transient; every other non-success status and any undecodable body
//! is permanent.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use veriflow_types::{CheckResult, SubjectId, UboReference};

use crate::{
    DataSource, ExternalError, FraudScorer, IdSignals, IdentityProvider, RecordCategory,
    Summarizer,
};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the shared reqwest client.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
        .build()
        .unwrap_or_default()
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn send_error(e: reqwest::Error) -> ExternalError {
    if e.is_timeout() {
        ExternalError::Transient(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ExternalError::Transient(format!("connection failed: {e}"))
    } else {
        ExternalError::Permanent(e.to_string())
    }
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: StatusCode, url: &str) -> ExternalError {
    if status == StatusCode::NOT_FOUND {
        ExternalError::NotFound(url.to_string())
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        ExternalError::Transient(format!("HTTP status {status} from {url}"))
    } else {
        ExternalError::Permanent(format!("HTTP status {status} from {url}"))
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    url: &str,
) -> Result<T, ExternalError> {
    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status, url));
    }
    response
        .json()
        .await
        .map_err(|e| ExternalError::Permanent(format!("failed to decode response from {url}: {e}")))
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, ExternalError> {
    let response = client.get(url).send().await.map_err(send_error)?;
    decode(response, url).await
}

// ── Data source ─────────────────────────────────────────────────────────

pub struct HttpDataSource {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpDataSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn lookup(
        &self,
        subject: &SubjectId,
        category: RecordCategory,
    ) -> Result<Option<serde_json::Value>, ExternalError> {
        let url = join(
            &self.base_url,
            &format!("subjects/{}/{}", subject.as_str(), category.as_str()),
        );
        match get_json::<serde_json::Value>(&self.http_client, &url).await {
            Ok(serde_json::Value::Null) => Ok(None),
            Ok(v) => Ok(Some(v)),
            Err(ExternalError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ── Identity provider ───────────────────────────────────────────────────

pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn check_id(&self, inquiry_reference: &str) -> Result<IdSignals, ExternalError> {
        let url = join(&self.base_url, &format!("inquiries/{inquiry_reference}"));
        get_json(&self.http_client, &url).await
    }
}

// ── Fraud scorer ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

pub struct HttpFraudScorer {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpFraudScorer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl FraudScorer for HttpFraudScorer {
    async fn score(&self, subject: &SubjectId) -> Result<f64, ExternalError> {
        let url = join(&self.base_url, &format!("scores/{}", subject.as_str()));
        let resp: ScoreResponse = get_json(&self.http_client, &url).await?;
        Ok(resp.score)
    }
}

// ── Summarizer ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SummaryRequest<'a> {
    results: &'a [CheckResult],
    ubo_references: &'a [UboReference],
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: String,
}

pub struct HttpSummarizer {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSummarizer {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client: build_client(timeout),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(
        &self,
        results: &[CheckResult],
        ubos: &[UboReference],
    ) -> Result<String, ExternalError> {
        let url = join(&self.base_url, "summaries");
        let body = SummaryRequest {
            results,
            ubo_references: ubos,
        };
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;
        let resp: SummaryResponse = decode(response, &url).await?;
        Ok(resp.summary)
    }
}
