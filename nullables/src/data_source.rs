//! Nullable data source: scripted subject records, no network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use veriflow_integrations::{DataSource, ExternalError, RecordCategory};
use veriflow_types::SubjectId;

type Key = (String, RecordCategory);

/// An in-memory data source for testing.
///
/// Unknown records answer `Ok(None)`. Failures can be injected per record, for
/// the next N calls, or for everything (outage).
pub struct NullDataSource {
    records: Mutex<HashMap<Key, serde_json::Value>>,
    errors: Mutex<HashMap<Key, ExternalError>>,
    outage: AtomicBool,
    flaky_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl NullDataSource {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
            outage: AtomicBool::new(false),
            flaky_remaining: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Store a record for a subject.
    pub fn insert(&self, subject: &str, category: RecordCategory, value: serde_json::Value) {
        self.records
            .lock()
            .unwrap()
            .insert((subject.to_string(), category), value);
    }

    /// Make one record fail with the given error on every lookup.
    pub fn fail(&self, subject: &str, category: RecordCategory, error: ExternalError) {
        self.errors
            .lock()
            .unwrap()
            .insert((subject.to_string(), category), error);
    }

    /// While set, every lookup fails transiently.
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    /// The next `n` lookups fail transiently, whatever they ask for.
    pub fn fail_next(&self, n: usize) {
        self.flaky_remaining.store(n, Ordering::SeqCst);
    }

    /// Total lookups seen, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for NullDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataSource for NullDataSource {
    async fn lookup(
        &self,
        subject: &SubjectId,
        category: RecordCategory,
    ) -> Result<Option<serde_json::Value>, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.outage.load(Ordering::SeqCst) {
            return Err(ExternalError::Transient("data source unavailable".into()));
        }
        let flaky = self
            .flaky_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if flaky {
            return Err(ExternalError::Transient("data source hiccup".into()));
        }
        let key = (subject.as_str().to_string(), category);
        if let Some(err) = self.errors.lock().unwrap().get(&key) {
            return Err(err.clone());
        }
        Ok(self.records.lock().unwrap().get(&key).cloned())
    }
}
