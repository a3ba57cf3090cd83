//! In-process journal with the same contract as the durable adapter.
//!
//! Backs unit and integration tests, and local runs that do not need
//! persistence across restarts. FIFO order and replay-exactly-published hold;
//! durability is process-lifetime only.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::Result;
use crate::journal::{subject_matches, subjects, Journal, JournalEntry};

#[derive(Debug, Clone)]
struct StoredRecord {
    sequence: u64,
    subject: String,
    payload: Vec<u8>,
    published_at: DateTime<Utc>,
}

/// Thread-safe in-memory journal.
#[derive(Clone)]
pub struct MemoryJournal {
    records: Arc<Mutex<Vec<StoredRecord>>>,
    next_sequence: Arc<AtomicU64>,
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            next_sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of records currently held, across all subjects.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl Journal for MemoryJournal {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<u64> {
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
        self.records
            .lock()
            .retain(|r| !subject_matches(filter, &r.subject));
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let records = self.records.lock();
        let sessions: BTreeSet<String> = records
            .iter()
            .filter_map(|r| subjects::session_of(&r.subject))
            .map(str::to_string)
            .collect();
        Ok(sessions.into_iter().collect())
    }
}
