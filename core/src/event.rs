use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Event categories, one per journal subject leaf.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Task,
    Note,
    Iteration,
    Inbox,
    Control,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Task => "task",
            EventType::Note => "note",
            EventType::Iteration => "iteration",
            EventType::Inbox => "inbox",
            EventType::Control => "control",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "task" => Ok(EventType::Task),
            "note" => Ok(EventType::Note),
            "iteration" => Ok(EventType::Iteration),
            "inbox" => Ok(EventType::Inbox),
            "control" => Ok(EventType::Control),
            other => Err(StoreError::invalid_enum("event type", other)),
        }
    }
}

/// Type-scoped action verbs. The projection skips actions it does not know,
/// so this list can grow without breaking old readers.
pub mod actions {
    pub const ADD: &str = "add";
    pub const STATUS: &str = "status";
    pub const PRIORITY: &str = "priority";
    pub const DEPENDS: &str = "depends";
    pub const CONTENT: &str = "content";
    pub const TYPE: &str = "type";
    pub const DELETE: &str = "delete";
    pub const MARK_READ: &str = "mark_read";
    pub const START: &str = "start";
    pub const COMPLETE: &str = "complete";
    pub const SUMMARY: &str = "summary";
    pub const SESSION_COMPLETE: &str = "session_complete";
    pub const SESSION_RESTART: &str = "session_restart";
    pub const SET_MODEL: &str = "set_model";
}

/// An immutable record in the append-only session journal.
///
/// Events are the single source of truth; current state is always the fold
/// of all events for a session. The `meta` map is opaque and action-scoped,
/// and unknown top-level fields survive a decode-then-encode round trip via
/// the flattened `extra` map, so additive schema changes are safe in both
/// directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Client-supplied stable ID (e.g. `TAS-7`); when empty, the journal
    /// sequence rendered as a string stands in during projection
    #[serde(default)]
    pub id: String,
    /// Wall-clock at publish
    pub timestamp: DateTime<Utc>,
    /// Owning session name
    pub session: String,
    /// Event category
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Type-scoped verb, see [`actions`]
    pub action: String,
    /// Action-specific keys, opaque to the transport
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
    /// Primary textual payload
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    /// Unknown fields, preserved for forward compatibility
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// New event stamped with the current wall-clock.
    pub fn new(session: impl Into<String>, event_type: EventType, action: &str) -> Self {
        Self {
            id: String::new(),
            timestamp: Utc::now(),
            session: session.into(),
            event_type,
            action: action.to_string(),
            meta: Map::new(),
            data: String::new(),
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    /// String meta value, if present and a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Unsigned meta value. JSON numbers may arrive as floats; both forms
    /// are accepted.
    pub fn meta_u64(&self, key: &str) -> Option<u64> {
        let value = self.meta.get(key)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|f| f as u64))
    }

    /// Iteration number from meta, defaulting to 0 when absent.
    pub fn meta_iteration(&self) -> u32 {
        self.meta_u64("iteration").unwrap_or(0) as u32
    }

    /// String list meta value; non-string elements are dropped.
    pub fn meta_str_list(&self, key: &str) -> Vec<String> {
        self.meta
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Encode to the UTF-8 JSON wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from the wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
