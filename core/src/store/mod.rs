//! The store: the mediator between commands and the journal.
//!
//! Every command runs the same four phases: load the session state by full
//! replay, validate preconditions against that state, publish one or more
//! events, and synthesize the post-event view for the caller without
//! re-loading. The store keeps no state between calls; the journal is the
//! only ground truth, which makes the store safe for concurrent use without
//! any locking of its own.

mod control;
mod inbox;
mod iterations;
mod notes;
mod sessions;
mod tasks;

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::event::Event;
use crate::journal::{subjects, Journal};
use crate::models::State;
use crate::projection;

/// Stateless command surface over a [`Journal`].
pub struct Store<J> {
    journal: Arc<J>,
}

impl<J> Clone for Store<J> {
    fn clone(&self) -> Self {
        Self {
            journal: self.journal.clone(),
        }
    }
}

impl<J: Journal> Store<J> {
    pub fn new(journal: Arc<J>) -> Self {
        Self { journal }
    }

    /// The underlying journal handle.
    pub fn journal(&self) -> Arc<J> {
        self.journal.clone()
    }

    /// Replay a session's events into its current state.
    pub async fn load(&self, session: &str) -> Result<State> {
        validate_session_name(session)?;
        let entries = self.journal.replay(&subjects::session(session)).await?;
        let state = projection::project(session, &entries);
        debug!(
            session,
            events = entries.len(),
            malformed = state.malformed_events,
            "Loaded session state"
        );
        Ok(state)
    }

    /// Publish an event under its canonical subject. Each published event is
    /// a fact and is never retracted.
    pub(crate) async fn append(&self, event: &Event) -> Result<u64> {
        let subject = subjects::event(&event.session, event.event_type);
        self.journal.publish(&subject, event.to_bytes()?).await
    }
}

/// Session names become NATS subject tokens, so the character set is tight.
pub fn validate_session_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::empty_field("session"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::invalid_session(name));
    }
    Ok(())
}

/// Normal form for duplicate-content detection: trimmed and lowercased.
pub(crate) fn normalize_content(content: &str) -> String {
    content.trim().to_lowercase()
}

/// Commands take `None` to mean "the current iteration".
pub(crate) fn resolve_iteration(state: &State, iteration: Option<u32>) -> u32 {
    iteration.unwrap_or_else(|| state.current_iteration())
}
