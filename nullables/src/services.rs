//! Nullable identity provider, fraud scorer and summarizer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use veriflow_integrations::{ExternalError, FraudScorer, IdSignals, IdentityProvider, Summarizer};
use veriflow_types::{CheckResult, SubjectId, UboReference};

use crate::fixtures;

// ── Identity provider ───────────────────────────────────────────────────

/// Identity provider answering from a table of inquiries.
pub struct NullIdentityProvider {
    inquiries: Mutex<HashMap<String, IdSignals>>,
    /// When set, unknown references get fully passing signals for this name.
    fallback_name: Option<String>,
    unavailable: AtomicBool,
}

impl NullIdentityProvider {
    /// Unknown inquiries are not found.
    pub fn scripted() -> Self {
        Self {
            inquiries: Mutex::new(HashMap::new()),
            fallback_name: None,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Every inquiry passes, with the document issued to [`fixtures::DEFAULT_NAME`].
    pub fn passing() -> Self {
        Self {
            fallback_name: Some(fixtures::DEFAULT_NAME.to_string()),
            ..Self::scripted()
        }
    }

    pub fn register(&self, inquiry_reference: &str, signals: IdSignals) {
        self.inquiries
            .lock()
            .unwrap()
            .insert(inquiry_reference.to_string(), signals);
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for NullIdentityProvider {
    async fn check_id(&self, inquiry_reference: &str) -> Result<IdSignals, ExternalError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ExternalError::Transient("identity provider unavailable".into()));
        }
        if let Some(signals) = self.inquiries.lock().unwrap().get(inquiry_reference) {
            return Ok(signals.clone());
        }
        match &self.fallback_name {
            Some(name) => Ok(fixtures::id_signals(inquiry_reference, name)),
            None => Err(ExternalError::NotFound(inquiry_reference.to_string())),
        }
    }
}

// ── Fraud scorer ────────────────────────────────────────────────────────

enum ScoreBehavior {
    Fixed(f64),
    Unavailable,
    Rejecting,
    Hang,
}

/// Fraud scorer returning a fixed score, optionally after a delay.
pub struct NullFraudScorer {
    behavior: ScoreBehavior,
    per_subject: Mutex<HashMap<String, f64>>,
    delay: Option<Duration>,
    fail_first: usize,
    calls: AtomicUsize,
}

impl NullFraudScorer {
    pub fn new(score: f64) -> Self {
        Self::with_behavior(ScoreBehavior::Fixed(score))
    }

    /// Every call fails transiently.
    pub fn unavailable() -> Self {
        Self::with_behavior(ScoreBehavior::Unavailable)
    }

    /// Every call fails permanently.
    pub fn rejecting() -> Self {
        Self::with_behavior(ScoreBehavior::Rejecting)
    }

    /// Every call waits forever.
    pub fn hanging() -> Self {
        Self::with_behavior(ScoreBehavior::Hang)
    }

    fn with_behavior(behavior: ScoreBehavior) -> Self {
        Self {
            behavior,
            per_subject: Mutex::new(HashMap::new()),
            delay: None,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` calls transiently, then behave as configured.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Override the score for one subject.
    pub fn set_score(&self, subject: &str, score: f64) {
        self.per_subject
            .lock()
            .unwrap()
            .insert(subject.to_string(), score);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FraudScorer for NullFraudScorer {
    async fn score(&self, subject: &SubjectId) -> Result<f64, ExternalError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.fail_first {
            return Err(ExternalError::Transient("fraud scorer returned 503".into()));
        }
        if let Some(score) = self.per_subject.lock().unwrap().get(subject.as_str()) {
            return Ok(*score);
        }
        match self.behavior {
            ScoreBehavior::Fixed(score) => Ok(score),
            ScoreBehavior::Unavailable => {
                Err(ExternalError::Transient("fraud scorer unavailable".into()))
            }
            ScoreBehavior::Rejecting => {
                Err(ExternalError::Permanent("fraud scorer rejected the subject".into()))
            }
            ScoreBehavior::Hang => std::future::pending::<Result<f64, ExternalError>>().await,
        }
    }
}

// ── Summarizer ──────────────────────────────────────────────────────────

/// Summarizer that echoes result counts, or fails on demand.
pub struct NullSummarizer {
    available: bool,
    calls: AtomicUsize,
}

impl NullSummarizer {
    pub fn new() -> Self {
        Self {
            available: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for NullSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for NullSummarizer {
    async fn summarize(
        &self,
        results: &[CheckResult],
        ubos: &[UboReference],
    ) -> Result<String, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(ExternalError::Transient("summary service unavailable".into()));
        }
        Ok(format!(
            "Reviewed {} checks and {} beneficial owners.",
            results.len(),
            ubos.len()
        ))
    }
}
