//! Journal seam: the append-only, subject-addressed log behind the store.
//!
//! The store only ever talks to this trait. The durable implementation
//! (NATS JetStream) lives in the `journal` crate; [`memory::MemoryJournal`]
//! provides the same contract in-process for tests and local runs.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::event::EventType;

/// One record as delivered by replay.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Stream sequence assigned at publish
    pub sequence: u64,
    /// Raw event payload (UTF-8 JSON)
    pub payload: Vec<u8>,
    /// Broker-side publish timestamp, when the transport exposes one
    pub published_at: Option<DateTime<Utc>>,
}

/// Append-only journaled pub/sub log.
///
/// Implementations must guarantee FIFO order per subject, durability before
/// `publish` returns, and that `replay` delivers exactly the set of records
/// successfully published for the filter, in publish order. No ordering is
/// required across different sessions.
///
/// All operations are safe for concurrent use.
#[async_trait]
pub trait Journal: Send + Sync {
    /// Append a payload under a subject.
    ///
    /// # Returns
    /// * `Ok(u64)` - The assigned stream sequence
    /// * `Err(StoreError::Transport)` - If the broker rejects or times out
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<u64>;

    /// All historical records matching a subject filter, in publish order.
    /// Terminates once caught up; the core path never tails.
    async fn replay(&self, filter: &str) -> Result<Vec<JournalEntry>>;

    /// Remove every record matching a subject filter.
    async fn purge(&self, filter: &str) -> Result<()>;

    /// Session names derived from the stream's `iteratr.<session>.*` subjects.
    async fn list_sessions(&self) -> Result<Vec<String>>;
}

/// Subject layout: `iteratr.<session>.<type>`.
pub mod subjects {
    use super::EventType;

    /// Root token for every subject this crate owns.
    pub const ROOT: &str = "iteratr";

    /// Wildcard covering every session and type.
    pub const ALL: &str = "iteratr.>";

    /// Subject for one event type within a session.
    pub fn event(session: &str, event_type: EventType) -> String {
        format!("{ROOT}.{session}.{}", event_type.as_str())
    }

    /// Wildcard covering all event types within a session.
    pub fn session(session: &str) -> String {
        format!("{ROOT}.{session}.>")
    }

    /// Session token of a subject, when it follows the layout.
    pub fn session_of(subject: &str) -> Option<&str> {
        let mut parts = subject.split('.');
        if parts.next() != Some(ROOT) {
            return None;
        }
        let session = parts.next()?;
        // A bare `iteratr.<session>` is not a valid event subject
        parts.next()?;
        Some(session)
    }
}

/// NATS-style subject matching: `*` matches one token, `>` matches the rest.
pub fn subject_matches(filter: &str, subject: &str) -> bool {
    let mut filter_tokens = filter.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (filter_tokens.next(), subject_tokens.next()) {
            (Some(">"), _) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(f), Some(s)) if f == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
