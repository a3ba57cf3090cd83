//! Mock implementation of the Journal trait
//!
//! Wraps an in-memory log with:
//! - Error injection capabilities
//! - Call tracking for verification

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iteratr_core::error::{Result, StoreError};
use iteratr_core::journal::{subject_matches, subjects, Journal, JournalEntry};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct StoredRecord {
    sequence: u64,
    subject: String,
    payload: Vec<u8>,
    published_at: DateTime<Utc>,
}

/// Mock journal for testing
///
/// Features:
/// - Thread-safe concurrent access
/// - One-shot error injection for failure testing
/// - Call history tracking for verification
pub struct MockJournal {
    records: Arc<Mutex<Vec<StoredRecord>>>,
    next_sequence: Arc<AtomicU64>,
    error_injection: Arc<Mutex<Option<StoreError>>>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl Default for MockJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl MockJournal {
    /// Create a new empty mock journal
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            next_sequence: Arc::new(AtomicU64::new(1)),
            error_injection: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Inject an error for the next operation
    pub fn inject_error(&self, error: StoreError) {
        *self.error_injection.lock() = Some(error);
    }

    /// Clear error injection
    pub fn clear_error(&self) {
        *self.error_injection.lock() = None;
    }

    /// Get history of called methods
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    /// Clear call history
    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    /// Assert a method was called
    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|call| call.contains(method)),
            "Method '{}' was not called. Call history: {:?}",
            method,
            *history
        );
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check_error_injection(&self) -> Result<()> {
        let mut error_opt = self.error_injection.lock();
        if let Some(error) = error_opt.take() {
            return Err(error);
        }
        Ok(())
    }

    fn record_call(&self, method: &str, params: &str) {
        self.call_history.lock().push(format!("{method}({params})"));
    }
}

#[async_trait]
impl Journal for MockJournal {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<u64> {
        self.record_call("publish", subject);
        self.check_error_injection()?;

        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        self.records.lock().push(StoredRecord {
            sequence,
            subject: subject.to_string(),
            payload,
            published_at: Utc::now(),
        });
        Ok(sequence)
    }

    async fn replay(&self, filter: &str) -> Result<Vec<JournalEntry>> {
        self.record_call("replay", filter);
        self.check_error_injection()?;

        let records = self.records.lock();
        Ok(records
            .iter()
            .filter(|r| subject_matches(filter, &r.subject))
            .map(|r| JournalEntry {
                sequence: r.sequence,
                payload: r.payload.clone(),
                published_at: Some(r.published_at),
            })
            .collect())
    }

    async fn purge(&self, filter: &str) -> Result<()> {
        self.record_call("purge", filter);
        self.check_error_injection()?;

        self.records
            .lock()
            .retain(|r| !subject_matches(filter, &r.subject));
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        self.record_call("list_sessions", "");
        self.check_error_injection()?;

        let records = self.records.lock();
        let sessions: BTreeSet<String> = records
            .iter()
            .filter_map(|r| subjects::session_of(&r.subject))
            .map(str::to_string)
            .collect();
        Ok(sessions.into_iter().collect())
    }
}
