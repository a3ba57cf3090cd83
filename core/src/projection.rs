//! Deterministic fold from an ordered event stream to a [`State`] value.
//!
//! The projection owns the entire interpretation of a session and is the
//! only code path that mutates `State`. It is total: any sequence of events
//! yields a valid state. Semantic validation (the cross-command invariants)
//! is the command layer's job; reducers here apply whatever the log says.
//! Unknown actions are skipped, and records that fail to decode are counted
//! and logged, never fatal.

use tracing::{trace, warn};

use crate::event::{actions, Event, EventType};
use crate::journal::JournalEntry;
use crate::models::{InboxMessage, Iteration, Note, State, Task, TaskStatus};
use crate::resolve::INBOX_PREFIX_MIN;

/// Highest priority value; reducers clamp into `0..=MAX_PRIORITY`.
pub const MAX_PRIORITY: u8 = 4;

/// Default priority assigned when a task-add event carries none.
pub const DEFAULT_PRIORITY: u8 = 2;

/// Replay a session's journal entries into its current state.
///
/// Events without a client-supplied ID take the journal sequence, rendered
/// as a string, as their stable ID.
pub fn project(session: &str, entries: &[JournalEntry]) -> State {
    let mut state = State::new(session);
    for entry in entries {
        match Event::from_bytes(&entry.payload) {
            Ok(mut event) => {
                if event.id.is_empty() {
                    event.id = entry.sequence.to_string();
                }
                apply(&mut state, &event);
            }
            Err(err) => {
                state.malformed_events += 1;
                warn!(
                    session,
                    sequence = entry.sequence,
                    error = %err,
                    "Skipping malformed journal record"
                );
            }
        }
    }
    state
}

/// Apply a single event to a state value.
pub fn apply(state: &mut State, event: &Event) {
    if state
        .last_activity
        .map(|seen| event.timestamp > seen)
        .unwrap_or(true)
    {
        state.last_activity = Some(event.timestamp);
    }

    match event.event_type {
        EventType::Task => apply_task(state, event),
        EventType::Note => apply_note(state, event),
        EventType::Iteration => apply_iteration(state, event),
        EventType::Inbox => apply_inbox(state, event),
        EventType::Control => apply_control(state, event),
    }
}

fn apply_task(state: &mut State, event: &Event) {
    match event.action.as_str() {
        actions::ADD => {
            let status = event
                .meta_str("status")
                .and_then(|s| s.parse().ok())
                .unwrap_or(TaskStatus::Remaining);
            let priority = event
                .meta_u64("priority")
                .map(|p| (p as u8).min(MAX_PRIORITY))
                .unwrap_or(DEFAULT_PRIORITY);
            let iteration = event.meta_iteration();

            state.tasks.insert(
                event.id.clone(),
                Task {
                    id: event.id.clone(),
                    content: event.data.clone(),
                    status,
                    priority,
                    depends_on: Vec::new(),
                    created_at: event.timestamp,
                    updated_at: event.timestamp,
                    iteration,
                },
            );
            state.task_counter += 1;

            if status == TaskStatus::InProgress {
                mark_task_started(state, iteration);
            }
        }
        actions::STATUS => {
            let Some(task_id) = event.meta_str("task_id") else {
                return;
            };
            let Some(status) = event.meta_str("status").and_then(|s| s.parse().ok()) else {
                return;
            };
            let iteration = event.meta_iteration();
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.status = status;
                task.updated_at = event.timestamp;
                task.iteration = iteration;
            }
            if status == TaskStatus::InProgress {
                mark_task_started(state, iteration);
            }
        }
        actions::PRIORITY => {
            let Some(task_id) = event.meta_str("task_id") else {
                return;
            };
            let Some(priority) = event.meta_u64("priority") else {
                return;
            };
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.priority = (priority as u8).min(MAX_PRIORITY);
                task.updated_at = event.timestamp;
                task.iteration = event.meta_iteration();
            }
        }
        actions::DEPENDS => {
            let Some(task_id) = event.meta_str("task_id") else {
                return;
            };
            let Some(depends_on) = event.meta_str("depends_on") else {
                return;
            };
            if let Some(task) = state.tasks.get_mut(task_id) {
                // Duplicates coalesce silently
                if !task.depends_on.iter().any(|d| d == depends_on) {
                    task.depends_on.push(depends_on.to_string());
                }
                task.updated_at = event.timestamp;
                task.iteration = event.meta_iteration();
            }
        }
        actions::CONTENT => {
            let Some(task_id) = event.meta_str("task_id") else {
                return;
            };
            if let Some(task) = state.tasks.get_mut(task_id) {
                task.content = event.data.clone();
                task.updated_at = event.timestamp;
            }
        }
        actions::DELETE => {
            if let Some(task_id) = event.meta_str("task_id") {
                state.tasks.remove(task_id);
            }
        }
        other => trace!(action = other, "Skipping unknown task action"),
    }
}

fn apply_note(state: &mut State, event: &Event) {
    match event.action.as_str() {
        actions::ADD => {
            let note_type = event
                .meta_str("type")
                .and_then(|t| t.parse().ok())
                .unwrap_or(crate::models::NoteType::Learning);
            state.notes.push(Note {
                id: event.id.clone(),
                content: event.data.clone(),
                note_type,
                created_at: event.timestamp,
                iteration: event.meta_iteration(),
            });
            state.note_counter += 1;
        }
        actions::CONTENT => {
            let Some(note_id) = event.meta_str("note_id") else {
                return;
            };
            if let Some(note) = state.notes.iter_mut().find(|n| n.id == note_id) {
                note.content = event.data.clone();
            }
        }
        actions::TYPE => {
            let Some(note_id) = event.meta_str("note_id") else {
                return;
            };
            let Some(note_type) = event.meta_str("type").and_then(|t| t.parse().ok()) else {
                return;
            };
            if let Some(note) = state.notes.iter_mut().find(|n| n.id == note_id) {
                note.note_type = note_type;
            }
        }
        actions::DELETE => {
            if let Some(note_id) = event.meta_str("note_id") {
                state.notes.retain(|n| n.id != note_id);
            }
        }
        other => trace!(action = other, "Skipping unknown note action"),
    }
}

fn apply_iteration(state: &mut State, event: &Event) {
    let Some(number) = event.meta_u64("number").map(|n| n as u32) else {
        return;
    };
    match event.action.as_str() {
        actions::START => {
            state
                .iterations
                .push(Iteration::started(number, event.timestamp));
        }
        actions::COMPLETE => {
            if let Some(iteration) = state.iteration_mut(number) {
                iteration.complete = true;
                iteration.ended_at = Some(event.timestamp);
            }
        }
        actions::SUMMARY => {
            let tasks_worked = event.meta_str_list("tasks_worked");
            if let Some(iteration) = state.iteration_mut(number) {
                iteration.summary = Some(event.data.clone());
                iteration.tasks_worked = tasks_worked;
            }
        }
        other => trace!(action = other, "Skipping unknown iteration action"),
    }
}

fn apply_inbox(state: &mut State, event: &Event) {
    match event.action.as_str() {
        actions::ADD => {
            state.inbox.push(InboxMessage {
                id: event.id.clone(),
                content: event.data.clone(),
                read: false,
                created_at: event.timestamp,
            });
        }
        actions::MARK_READ => {
            let Some(query) = event.meta_str("message_id") else {
                return;
            };
            if let Some(message) = state.inbox.iter_mut().find(|m| m.id == query) {
                message.read = true;
                return;
            }
            // Prefix form: long enough and unambiguous, otherwise a no-op
            if query.len() < INBOX_PREFIX_MIN {
                return;
            }
            let mut matches = state
                .inbox
                .iter_mut()
                .filter(|m| m.id.starts_with(query));
            if let (Some(message), None) = (matches.next(), matches.next()) {
                message.read = true;
            }
        }
        other => trace!(action = other, "Skipping unknown inbox action"),
    }
}

fn apply_control(state: &mut State, event: &Event) {
    match event.action.as_str() {
        actions::SESSION_COMPLETE => state.complete = true,
        actions::SESSION_RESTART => state.complete = false,
        actions::SET_MODEL => state.model = event.data.clone(),
        other => trace!(action = other, "Skipping unknown control action"),
    }
}

fn mark_task_started(state: &mut State, number: u32) {
    if let Some(iteration) = state.iteration_mut(number) {
        iteration.task_started = true;
    }
}
