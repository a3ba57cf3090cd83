//! Iteratr Core Library
//!
//! Event-sourced session state engine for driving an AI coding agent through
//! bounded iterations. Every decision (task creation, status change, note,
//! iteration boundary, control action) is an immutable event in a journaled
//! pub/sub log, and current state is always the fold of all events for a
//! session.
//!
//! # Architecture
//!
//! - [`event`] - The canonical append-only event record and action vocabulary
//! - [`models`] - Domain models (Task, Note, Iteration, InboxMessage, State)
//! - [`error`] - Error taxonomy and result handling
//! - [`journal`] - The journal trait and the in-memory implementation
//! - [`projection`] - The deterministic fold from events to State
//! - [`store`] - The command surface: load, validate, publish, return
//! - [`resolve`] - Unique-prefix ID resolution
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use iteratr_core::{journal::memory::MemoryJournal, models::TaskDraft, store::Store};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> iteratr_core::error::Result<()> {
//! let store = Store::new(Arc::new(MemoryJournal::new()));
//! let task = store.task_add("demo", TaskDraft::new("write the docs"), None).await?;
//! assert_eq!(task.id, "TAS-1");
//!
//! let state = store.load("demo").await?;
//! assert_eq!(state.task_counter, 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod event;
pub mod journal;
pub mod models;
pub mod projection;
pub mod resolve;
pub mod store;

// Re-export commonly used types at the crate root for convenience
pub use error::{Result, StoreError};
pub use event::{Event, EventType};
pub use journal::{Journal, JournalEntry};
pub use models::{
    InboxMessage, Iteration, Note, NoteType, SessionSummary, State, SummaryOutcome, Task,
    TaskDraft, TaskGroups, TaskStatus,
};
pub use store::Store;

/// Current version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
