use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// A unit of work tracked for a session.
///
/// Tasks carry a stable `TAS-<n>` identifier assigned from a per-session
/// counter, a free-form content line, a lifecycle status, a priority in
/// `0..=4` (lower is more urgent), and a set of dependency task IDs. A task
/// is never mutated in place on disk; every change is an event in the
/// session journal and the task value here is the fold of those events.
///
/// # Examples
///
/// ```rust
/// use iteratr_core::models::{Task, TaskStatus};
/// use chrono::Utc;
///
/// let task = Task {
///     id: "TAS-1".to_string(),
///     content: "Wire up the journal adapter".to_string(),
///     status: TaskStatus::Remaining,
///     priority: 2,
///     depends_on: vec![],
///     created_at: Utc::now(),
///     updated_at: Utc::now(),
///     iteration: 0,
/// };
///
/// assert!(!task.status.is_terminal());
/// assert_eq!(task.ordinal(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Stable identifier, `TAS-<n>`
    pub id: String,
    /// Task description (non-empty)
    pub content: String,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Urgency, 0 (highest) through 4 (lowest)
    pub priority: u8,
    /// IDs of tasks that must be completed before this one is ready
    pub depends_on: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last event that touched this task
    pub updated_at: DateTime<Utc>,
    /// Iteration number that last touched this task
    pub iteration: u32,
}

impl Task {
    /// Numeric part of the task ID, used for deterministic ordering.
    /// `TAS-12` sorts after `TAS-9` even though it compares lower as a string.
    pub fn ordinal(&self) -> u64 {
        id_ordinal(&self.id)
    }

    /// Sort key for listings: priority ascending, then ID ascending.
    pub fn sort_key(&self) -> (u8, u64) {
        (self.priority, self.ordinal())
    }
}

/// Parse the numeric suffix out of a `PREFIX-<n>` identifier.
/// Non-numeric IDs sort last.
pub fn id_ordinal(id: &str) -> u64 {
    id.rsplit('-')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX)
}

/// Task lifecycle states.
///
/// `Remaining` and `InProgress` are active; `Completed`, `Blocked`, and
/// `Cancelled` are terminal. A session can only be marked complete once
/// every task holds a terminal status. Transitions are unrestricted at the
/// event layer except for the in-progress guards: at most one task may be
/// `InProgress` at a time, and at most one task may ever enter `InProgress`
/// within a single iteration.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet started
    Remaining,
    /// Actively being worked on
    InProgress,
    /// Finished successfully
    Completed,
    /// Cannot proceed
    Blocked,
    /// Abandoned
    Cancelled,
}

impl TaskStatus {
    /// Whether this status counts toward session completion.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Blocked | TaskStatus::Cancelled
        )
    }

    /// Canonical wire form (`remaining`, `in_progress`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Remaining => "remaining",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// All statuses in display order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Remaining,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
        TaskStatus::Cancelled,
    ];
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "remaining" => Ok(TaskStatus::Remaining),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(StoreError::invalid_enum("status", other)),
        }
    }
}

/// Parameters for creating a task, used by single and batch adds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskDraft {
    /// Task description (non-empty after trimming)
    pub content: String,
    /// Initial status; defaults to `remaining`
    pub status: Option<TaskStatus>,
    /// Initial priority; defaults to 2, explicit 0 is preserved
    pub priority: Option<u8>,
}

impl TaskDraft {
    /// Draft with just a content line and all defaults.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: None,
            priority: None,
        }
    }
}

/// A note captured during a session: something learned, a place the agent
/// got stuck, a tip for later, or a decision taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    /// Stable identifier, `NOT-<n>`
    pub id: String,
    /// Note body (non-empty)
    pub content: String,
    /// Note category
    #[serde(rename = "type")]
    pub note_type: NoteType,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Iteration the note was recorded in
    pub iteration: u32,
}

/// Note categories.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    /// Something learned about the codebase or problem
    Learning,
    /// A place the agent got stuck
    Stuck,
    /// A tip for future iterations
    Tip,
    /// A decision that was made
    Decision,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::Learning => "learning",
            NoteType::Stuck => "stuck",
            NoteType::Tip => "tip",
            NoteType::Decision => "decision",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "learning" => Ok(NoteType::Learning),
            "stuck" => Ok(NoteType::Stuck),
            "tip" => Ok(NoteType::Tip),
            "decision" => Ok(NoteType::Decision),
            other => Err(StoreError::invalid_enum("type", other)),
        }
    }
}

/// One agent turn, bracketed by start and complete events.
///
/// `task_started` records whether any task entered `in_progress` during this
/// iteration; once set it gates further in-progress transitions until the
/// next iteration begins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Iteration {
    /// Iteration number, dense and increasing from 1
    pub number: u32,
    /// When the iteration began
    pub started_at: DateTime<Utc>,
    /// When the iteration was marked complete
    pub ended_at: Option<DateTime<Utc>>,
    /// Whether the iteration has been completed
    pub complete: bool,
    /// At most one summary per iteration
    pub summary: Option<String>,
    /// Task IDs worked during the iteration (from the summary)
    pub tasks_worked: Vec<String>,
    /// Whether a task entered `in_progress` during this iteration
    pub task_started: bool,
}

impl Iteration {
    /// Fresh iteration record with the given number and start time.
    pub fn started(number: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            number,
            started_at,
            ended_at: None,
            complete: false,
            summary: None,
            tasks_worked: Vec::new(),
            task_started: false,
        }
    }
}

/// A message left for the agent to pick up on its next load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboxMessage {
    /// Opaque token, 16+ characters
    pub id: String,
    /// Message body
    pub content: String,
    /// Read flag, monotonic false to true
    pub read: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// The projected state of a session: the fold of every event in its journal.
///
/// State is rebuilt on every load and never persisted directly. All
/// interpretation of the event stream lives in [`crate::projection`]; the
/// command layer only reads this value to validate preconditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct State {
    /// Session name
    pub session: String,
    /// Tasks keyed by ID
    pub tasks: HashMap<String, Task>,
    /// Count of task-add events observed; next task is `TAS-<counter+1>`
    pub task_counter: u32,
    /// Notes in creation order
    pub notes: Vec<Note>,
    /// Count of note-add events observed
    pub note_counter: u32,
    /// Iterations ordered by number
    pub iterations: Vec<Iteration>,
    /// Inbox messages in arrival order
    pub inbox: Vec<InboxMessage>,
    /// Whether the session has been marked complete
    pub complete: bool,
    /// Last model recorded via set_model
    pub model: String,
    /// Timestamp of the most recent event observed
    pub last_activity: Option<DateTime<Utc>>,
    /// Records that failed to decode during the load (skipped, never fatal)
    #[serde(skip)]
    pub malformed_events: u32,
}

impl State {
    /// Empty state for a named session.
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            ..Self::default()
        }
    }

    /// Highest started iteration number, or 0 when none have started.
    pub fn current_iteration(&self) -> u32 {
        self.iterations.last().map(|it| it.number).unwrap_or(0)
    }

    /// Iteration record by number.
    pub fn iteration(&self, number: u32) -> Option<&Iteration> {
        self.iterations.iter().find(|it| it.number == number)
    }

    pub(crate) fn iteration_mut(&mut self, number: u32) -> Option<&mut Iteration> {
        self.iterations.iter_mut().find(|it| it.number == number)
    }

    /// The task currently in progress, if any.
    pub fn in_progress_task(&self) -> Option<&Task> {
        self.tasks
            .values()
            .find(|t| t.status == TaskStatus::InProgress)
    }

    /// Number of tasks not yet in a terminal status.
    pub fn non_terminal_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|t| !t.status.is_terminal())
            .count()
    }

    /// Whether a task is ready: `remaining` with every dependency resolving
    /// to an existing, completed task. A dangling dependency blocks readiness.
    pub fn is_ready(&self, task: &Task) -> bool {
        task.status == TaskStatus::Remaining
            && task.depends_on.iter().all(|dep| {
                self.tasks
                    .get(dep)
                    .map(|d| d.status == TaskStatus::Completed)
                    .unwrap_or(false)
            })
    }

    /// Tasks with the given status, ordered by `(priority, id)`.
    pub fn tasks_with_status(&self, status: TaskStatus) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.sort_key());
        tasks
    }
}

/// Tasks grouped by status for listings, each group ordered by
/// `(priority asc, id asc)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskGroups {
    pub remaining: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
    pub blocked: Vec<Task>,
    pub cancelled: Vec<Task>,
}

impl TaskGroups {
    /// Group the tasks in a state snapshot.
    pub fn from_state(state: &State) -> Self {
        Self {
            remaining: state.tasks_with_status(TaskStatus::Remaining),
            in_progress: state.tasks_with_status(TaskStatus::InProgress),
            completed: state.tasks_with_status(TaskStatus::Completed),
            blocked: state.tasks_with_status(TaskStatus::Blocked),
            cancelled: state.tasks_with_status(TaskStatus::Cancelled),
        }
    }

    /// Total task count across all groups.
    pub fn len(&self) -> usize {
        self.remaining.len()
            + self.in_progress.len()
            + self.completed.len()
            + self.blocked.len()
            + self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shallow per-session rollup returned by `ListSessions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    pub name: String,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    pub last_activity: Option<DateTime<Utc>>,
    pub complete: bool,
    pub model: String,
}

impl SessionSummary {
    /// Build a summary from a loaded state.
    pub fn from_state(state: &State) -> Self {
        Self {
            name: state.session.clone(),
            tasks_total: state.tasks.len(),
            tasks_completed: state
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::Completed)
                .count(),
            last_activity: state.last_activity,
            complete: state.complete,
            model: state.model.clone(),
        }
    }
}

/// Outcome of recording an iteration summary. A second summary for the same
/// iteration is a friendly no-op rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    Recorded,
    AlreadyRecorded,
}
