//! Fluent builders for events and journal entries in tests.

use chrono::{DateTime, Utc};
use iteratr_core::event::{actions, Event, EventType};
use iteratr_core::journal::JournalEntry;
use serde_json::Value;

/// Builder for well-formed events with sensible defaults.
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new(session: &str, event_type: EventType, action: &str) -> Self {
        Self {
            event: Event::new(session, event_type, action),
        }
    }

    /// A `task.add` event with the canonical meta keys filled in.
    pub fn task_add(session: &str, id: &str, content: &str) -> Self {
        Self::new(session, EventType::Task, actions::ADD)
            .id(id)
            .data(content)
            .meta("status", "remaining")
            .meta("priority", 2)
            .meta("iteration", 0)
    }

    /// A `task.status` event.
    pub fn task_status(session: &str, task_id: &str, status: &str) -> Self {
        Self::new(session, EventType::Task, actions::STATUS)
            .meta("task_id", task_id)
            .meta("status", status)
            .meta("iteration", 0)
    }

    /// An `iteration.start` event.
    pub fn iteration_start(session: &str, number: u32) -> Self {
        Self::new(session, EventType::Iteration, actions::START).meta("number", number)
    }

    pub fn id(mut self, id: &str) -> Self {
        self.event.id = id.to_string();
        self
    }

    pub fn data(mut self, data: &str) -> Self {
        self.event.data = data.to_string();
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.event.meta.insert(key.to_string(), value.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.event.timestamp = timestamp;
        self
    }

    pub fn build(self) -> Event {
        self.event
    }

    /// Wrap the event as a journal entry with the given sequence.
    pub fn entry(self, sequence: u64) -> JournalEntry {
        let event = self.build();
        JournalEntry {
            sequence,
            payload: event.to_bytes().expect("builder events encode"),
            published_at: Some(event.timestamp),
        }
    }
}
