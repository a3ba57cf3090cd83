//! Task commands.

use std::collections::HashSet;

use tracing::info;

use crate::error::{Result, StoreError};
use crate::event::{actions, Event, EventType};
use crate::journal::Journal;
use crate::models::{State, Task, TaskDraft, TaskGroups, TaskStatus};
use crate::projection::{DEFAULT_PRIORITY, MAX_PRIORITY};
use crate::resolve::{resolve_id, TASK_PREFIX_MIN};
use crate::store::{normalize_content, resolve_iteration, Store};

impl<J: Journal> Store<J> {
    /// Add a single task.
    ///
    /// Content must be non-empty after trimming and must not collide with an
    /// existing task's content under trim+lowercase normalization; the
    /// conflict error names the colliding ID. Starting directly in
    /// `in_progress` is subject to the same guards as a status change.
    pub async fn task_add(
        &self,
        session: &str,
        draft: TaskDraft,
        iteration: Option<u32>,
    ) -> Result<Task> {
        let mut tasks = self
            .task_batch_add(session, vec![draft], iteration)
            .await?;
        Ok(tasks.remove(0))
    }

    /// Add several tasks from a single load, with sequential ID assignment.
    ///
    /// The whole batch is validated before the first publish: empty content,
    /// duplicates against existing tasks and within the batch, more than one
    /// `in_progress` entry, and the in-progress guards all fail the call
    /// before anything is written. Publishes then happen per event; a
    /// mid-batch transport failure leaves the already-published prefix
    /// applied, which is coherent state by construction.
    pub async fn task_batch_add(
        &self,
        session: &str,
        drafts: Vec<TaskDraft>,
        iteration: Option<u32>,
    ) -> Result<Vec<Task>> {
        if drafts.is_empty() {
            return Err(StoreError::empty_field("tasks"));
        }

        let state = self.load(session).await?;
        let iteration = resolve_iteration(&state, iteration);

        let mut staged: HashSet<String> = HashSet::new();
        let mut in_progress_count = 0usize;
        for draft in &drafts {
            let content = draft.content.trim();
            if content.is_empty() {
                return Err(StoreError::empty_field("content"));
            }
            if let Some(priority) = draft.priority {
                if priority > MAX_PRIORITY {
                    return Err(StoreError::priority_out_of_range(priority as i64));
                }
            }
            let normalized = normalize_content(content);
            if let Some(existing) = find_duplicate(&state, &normalized) {
                return Err(StoreError::duplicate_content(content, &existing.id));
            }
            if !staged.insert(normalized) {
                return Err(StoreError::Conflict(format!(
                    "Task with content '{content}' appears twice in the batch"
                )));
            }
            if draft.status == Some(TaskStatus::InProgress) {
                in_progress_count += 1;
            }
        }
        if in_progress_count > 1 {
            return Err(StoreError::Conflict(
                "At most one task in a batch may start in_progress".to_string(),
            ));
        }
        if in_progress_count == 1 {
            guard_in_progress(&state, iteration, None)?;
        }

        let mut created = Vec::with_capacity(drafts.len());
        for (offset, draft) in drafts.into_iter().enumerate() {
            let id = format!("TAS-{}", state.task_counter + 1 + offset as u32);
            let content = draft.content.trim().to_string();
            let status = draft.status.unwrap_or(TaskStatus::Remaining);
            let priority = draft.priority.unwrap_or(DEFAULT_PRIORITY);

            let event = Event::new(session, EventType::Task, actions::ADD)
                .with_id(&id)
                .with_data(&content)
                .with_meta("status", status.as_str())
                .with_meta("priority", priority)
                .with_meta("iteration", iteration);
            self.append(&event).await?;

            info!(session, task = %id, "Task added");
            created.push(Task {
                id,
                content,
                status,
                priority,
                depends_on: Vec::new(),
                created_at: event.timestamp,
                updated_at: event.timestamp,
                iteration,
            });
        }
        Ok(created)
    }

    /// Change a task's status, resolving the ID by exact match or unique
    /// prefix (minimum 3 characters).
    ///
    /// Transitions into `in_progress` are gated twice: no other task may be
    /// in progress, and the target iteration must not have seen a task start
    /// yet. All other transitions are unrestricted.
    pub async fn task_status(
        &self,
        session: &str,
        query: &str,
        status: TaskStatus,
        iteration: Option<u32>,
    ) -> Result<Task> {
        let state = self.load(session).await?;
        let id = resolve_task_id(&state, query)?;
        let iteration = resolve_iteration(&state, iteration);

        if status == TaskStatus::InProgress {
            guard_in_progress(&state, iteration, Some(&id))?;
        }

        let event = Event::new(session, EventType::Task, actions::STATUS)
            .with_meta("task_id", id.as_str())
            .with_meta("status", status.as_str())
            .with_meta("iteration", iteration);
        self.append(&event).await?;

        info!(session, task = %id, status = %status, "Task status changed");
        let mut task = state.tasks[&id].clone();
        task.status = status;
        task.updated_at = event.timestamp;
        task.iteration = iteration;
        Ok(task)
    }

    /// Set a task's priority (0 through 4).
    pub async fn task_priority(
        &self,
        session: &str,
        query: &str,
        priority: u8,
        iteration: Option<u32>,
    ) -> Result<Task> {
        if priority > MAX_PRIORITY {
            return Err(StoreError::priority_out_of_range(priority as i64));
        }
        let state = self.load(session).await?;
        let id = resolve_task_id(&state, query)?;
        let iteration = resolve_iteration(&state, iteration);

        let event = Event::new(session, EventType::Task, actions::PRIORITY)
            .with_meta("task_id", id.as_str())
            .with_meta("priority", priority)
            .with_meta("iteration", iteration);
        self.append(&event).await?;

        let mut task = state.tasks[&id].clone();
        task.priority = priority;
        task.updated_at = event.timestamp;
        task.iteration = iteration;
        Ok(task)
    }

    /// Record that one task depends on another. Both IDs resolve by prefix;
    /// self-dependency and edges that would close a cycle are conflicts, and
    /// re-adding an existing edge is idempotent.
    pub async fn task_depends(
        &self,
        session: &str,
        query: &str,
        depends_query: &str,
        iteration: Option<u32>,
    ) -> Result<Task> {
        let state = self.load(session).await?;
        let id = resolve_task_id(&state, query)?;
        let depends_on = resolve_task_id(&state, depends_query)?;

        if id == depends_on {
            return Err(StoreError::self_dependency(&id));
        }
        if would_cycle(&state, &id, &depends_on) {
            return Err(StoreError::dependency_cycle(&id, &depends_on));
        }

        let mut task = state.tasks[&id].clone();
        if task.depends_on.iter().any(|d| d == &depends_on) {
            return Ok(task);
        }

        let iteration = resolve_iteration(&state, iteration);
        let event = Event::new(session, EventType::Task, actions::DEPENDS)
            .with_meta("task_id", id.as_str())
            .with_meta("depends_on", depends_on.as_str())
            .with_meta("iteration", iteration);
        self.append(&event).await?;

        task.depends_on.push(depends_on);
        task.updated_at = event.timestamp;
        task.iteration = iteration;
        Ok(task)
    }

    /// All tasks grouped by status, each group ordered by `(priority, id)`.
    pub async fn task_list(&self, session: &str) -> Result<TaskGroups> {
        let state = self.load(session).await?;
        Ok(TaskGroups::from_state(&state))
    }

    /// The single ready task with the lowest priority value, ties broken by
    /// lowest ID. Read-only; returns `None` when nothing is ready.
    pub async fn task_next(&self, session: &str) -> Result<Option<Task>> {
        let state = self.load(session).await?;
        Ok(state
            .tasks
            .values()
            .filter(|t| state.is_ready(t))
            .min_by_key(|t| t.sort_key())
            .cloned())
    }
}

fn resolve_task_id(state: &State, query: &str) -> Result<String> {
    resolve_id(
        state.tasks.keys().map(String::as_str),
        query,
        TASK_PREFIX_MIN,
        "Task",
    )
}

fn find_duplicate<'a>(state: &'a State, normalized: &str) -> Option<&'a Task> {
    state
        .tasks
        .values()
        .find(|t| normalize_content(&t.content) == normalized)
}

/// The two in-progress guards: one task in progress per session, and one
/// task start per iteration. `exclude` lets a task re-assert its own
/// in-progress status without tripping the first guard.
fn guard_in_progress(state: &State, iteration: u32, exclude: Option<&str>) -> Result<()> {
    if let Some(current) = state
        .tasks
        .values()
        .find(|t| t.status == TaskStatus::InProgress && Some(t.id.as_str()) != exclude)
    {
        return Err(StoreError::task_in_progress(&current.id));
    }
    if let Some(it) = state.iteration(iteration) {
        if it.task_started {
            return Err(StoreError::iteration_already_started(iteration));
        }
    }
    Ok(())
}

/// Would adding `task -> dep` close a cycle through existing edges?
fn would_cycle(state: &State, task_id: &str, dep_id: &str) -> bool {
    let mut stack = vec![dep_id.to_string()];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if current == task_id {
            return true;
        }
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(task) = state.tasks.get(&current) {
            stack.extend(task.depends_on.iter().cloned());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::memory::MemoryJournal;
    use std::sync::Arc;

    fn store() -> Store<MemoryJournal> {
        Store::new(Arc::new(MemoryJournal::new()))
    }

    #[tokio::test]
    async fn test_add_assigns_sequential_ids() {
        let store = store();
        let a = store
            .task_add("demo", TaskDraft::new("first"), None)
            .await
            .unwrap();
        let b = store
            .task_add("demo", TaskDraft::new("second"), None)
            .await
            .unwrap();
        assert_eq!(a.id, "TAS-1");
        assert_eq!(b.id, "TAS-2");
        assert_eq!(a.status, TaskStatus::Remaining);
        assert_eq!(a.priority, 2);
    }

    #[tokio::test]
    async fn test_duplicate_content_rejected_case_insensitively() {
        let store = store();
        store
            .task_add("demo", TaskDraft::new("Fix the build"), None)
            .await
            .unwrap();

        let err = store
            .task_add("demo", TaskDraft::new("  fix THE build  "), None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("already exists"));
        assert!(err.to_string().contains("TAS-1"));
    }

    #[tokio::test]
    async fn test_empty_content_rejected() {
        let store = store();
        let err = store
            .task_add("demo", TaskDraft::new("   "), None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_batch_validates_before_publishing() {
        let store = store();
        let drafts = vec![TaskDraft::new("ok"), TaskDraft::new("OK")];
        let err = store.task_batch_add("demo", drafts, None).await.unwrap_err();
        assert!(err.is_conflict());

        // Nothing was published for the failed batch
        let state = store.load("demo").await.unwrap();
        assert_eq!(state.task_counter, 0);
    }

    #[tokio::test]
    async fn test_batch_allows_at_most_one_in_progress() {
        let store = store();
        let mut first = TaskDraft::new("a");
        first.status = Some(TaskStatus::InProgress);
        let mut second = TaskDraft::new("b");
        second.status = Some(TaskStatus::InProgress);

        let err = store
            .task_batch_add("demo", vec![first, second], None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_only_one_task_in_progress() {
        let store = store();
        store
            .task_batch_add(
                "demo",
                vec![TaskDraft::new("a"), TaskDraft::new("b")],
                None,
            )
            .await
            .unwrap();

        store
            .task_status("demo", "TAS-1", TaskStatus::InProgress, None)
            .await
            .unwrap();
        let err = store
            .task_status("demo", "TAS-2", TaskStatus::InProgress, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Only one task can be in progress"));
        assert!(err.to_string().contains("TAS-1"));
    }

    #[tokio::test]
    async fn test_same_task_can_reassert_in_progress_outside_iteration() {
        let store = store();
        store
            .task_add("demo", TaskDraft::new("a"), None)
            .await
            .unwrap();
        store
            .task_status("demo", "TAS-1", TaskStatus::InProgress, None)
            .await
            .unwrap();
        // No iteration started, so only the one-in-progress guard applies,
        // and the task itself is excluded from it
        store
            .task_status("demo", "TAS-1", TaskStatus::InProgress, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_iteration_guard_blocks_second_start() {
        let store = store();
        store
            .task_batch_add(
                "demo",
                vec![TaskDraft::new("a"), TaskDraft::new("b")],
                None,
            )
            .await
            .unwrap();
        store.iteration_start("demo", 1).await.unwrap();

        store
            .task_status("demo", "TAS-1", TaskStatus::InProgress, Some(1))
            .await
            .unwrap();
        store
            .task_status("demo", "TAS-1", TaskStatus::Completed, Some(1))
            .await
            .unwrap();

        let err = store
            .task_status("demo", "TAS-2", TaskStatus::InProgress, Some(1))
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("already started during this iteration"));
    }

    #[tokio::test]
    async fn test_status_resolves_prefix() {
        let store = store();
        for content in ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"] {
            store
                .task_add("demo", TaskDraft::new(content), None)
                .await
                .unwrap();
        }
        // "TAS-1" is exact even though TAS-10..12 share the prefix
        let task = store
            .task_status("demo", "TAS-1", TaskStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(task.id, "TAS-1");

        // "TAS-12" only matches itself
        let task = store
            .task_status("demo", "TAS-12", TaskStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(task.id, "TAS-12");

        let err = store
            .task_status("demo", "TAS", TaskStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(err.is_ambiguous());
    }

    #[tokio::test]
    async fn test_priority_range_checked() {
        let store = store();
        store
            .task_add("demo", TaskDraft::new("a"), None)
            .await
            .unwrap();
        let err = store
            .task_priority("demo", "TAS-1", 5, None)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let task = store.task_priority("demo", "TAS-1", 0, None).await.unwrap();
        assert_eq!(task.priority, 0);
    }

    #[tokio::test]
    async fn test_depends_rejects_self_and_cycles() {
        let store = store();
        store
            .task_batch_add(
                "demo",
                vec![TaskDraft::new("a"), TaskDraft::new("b"), TaskDraft::new("c")],
                None,
            )
            .await
            .unwrap();

        let err = store
            .task_depends("demo", "TAS-1", "TAS-1", None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        store.task_depends("demo", "TAS-2", "TAS-1", None).await.unwrap();
        store.task_depends("demo", "TAS-3", "TAS-2", None).await.unwrap();
        // TAS-1 -> TAS-3 would close the loop
        let err = store
            .task_depends("demo", "TAS-1", "TAS-3", None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("cycle"));
    }

    #[tokio::test]
    async fn test_depends_is_idempotent() {
        let store = store();
        store
            .task_batch_add("demo", vec![TaskDraft::new("a"), TaskDraft::new("b")], None)
            .await
            .unwrap();

        store.task_depends("demo", "TAS-2", "TAS-1", None).await.unwrap();
        let task = store
            .task_depends("demo", "TAS-2", "TAS-1", None)
            .await
            .unwrap();
        assert_eq!(task.depends_on, vec!["TAS-1".to_string()]);

        let state = store.load("demo").await.unwrap();
        assert_eq!(state.tasks["TAS-2"].depends_on.len(), 1);
    }

    #[tokio::test]
    async fn test_task_next_prefers_priority_then_id() {
        let store = store();
        let mut p3 = TaskDraft::new("low");
        p3.priority = Some(3);
        let mut p1 = TaskDraft::new("mid");
        p1.priority = Some(1);
        let mut p0 = TaskDraft::new("urgent");
        p0.priority = Some(0);
        store
            .task_batch_add("demo", vec![p3, p1, p0], None)
            .await
            .unwrap();

        let next = store.task_next("demo").await.unwrap().unwrap();
        assert_eq!(next.content, "urgent");

        store
            .task_status("demo", &next.id, TaskStatus::InProgress, None)
            .await
            .unwrap();
        store
            .task_status("demo", &next.id, TaskStatus::Completed, None)
            .await
            .unwrap();

        let next = store.task_next("demo").await.unwrap().unwrap();
        assert_eq!(next.content, "mid");
    }

    #[tokio::test]
    async fn test_task_next_honors_dependencies() {
        let store = store();
        store
            .task_batch_add("demo", vec![TaskDraft::new("a"), TaskDraft::new("b")], None)
            .await
            .unwrap();
        store.task_depends("demo", "TAS-1", "TAS-2", None).await.unwrap();

        // TAS-1 is blocked on TAS-2, so TAS-2 is the only ready task
        let next = store.task_next("demo").await.unwrap().unwrap();
        assert_eq!(next.id, "TAS-2");

        store
            .task_status("demo", "TAS-2", TaskStatus::Completed, None)
            .await
            .unwrap();
        let next = store.task_next("demo").await.unwrap().unwrap();
        assert_eq!(next.id, "TAS-1");
    }

    #[tokio::test]
    async fn test_task_next_none_when_nothing_ready() {
        let store = store();
        assert!(store.task_next("demo").await.unwrap().is_none());

        store.task_add("demo", TaskDraft::new("a"), None).await.unwrap();
        store
            .task_status("demo", "TAS-1", TaskStatus::Cancelled, None)
            .await
            .unwrap();
        assert!(store.task_next("demo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_task_list_groups() {
        let store = store();
        store
            .task_batch_add("demo", vec![TaskDraft::new("a"), TaskDraft::new("b")], None)
            .await
            .unwrap();
        store
            .task_status("demo", "TAS-2", TaskStatus::Completed, None)
            .await
            .unwrap();

        let groups = store.task_list("demo").await.unwrap();
        assert_eq!(groups.remaining.len(), 1);
        assert_eq!(groups.completed.len(), 1);
        assert_eq!(groups.len(), 2);
    }
}
