//! Tool dispatch: one handler per MCP tool, routed by name.
//!
//! Every outcome, success or failure, is a single text payload. The success
//! templates are contract-level; agents and tests match on them verbatim.
//! Errors come back as the same payload prefixed with `error:` so the
//! transport always reports success and the body carries the command outcome.

use iteratr_core::error::Result;
use iteratr_core::models::{SummaryOutcome, Task, TaskDraft, TaskGroups};
use iteratr_core::{Journal, Store};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::args::Args;

/// Tools exposed over `POST /mcp`.
pub const TOOL_NAMES: [&str; 8] = [
    "task-add",
    "task-update",
    "task-list",
    "task-next",
    "note-add",
    "note-list",
    "iteration-summary",
    "session-complete",
];

/// Route a tool call to its handler and render the outcome as text.
pub async fn dispatch<J: Journal>(
    store: &Store<J>,
    session: &str,
    name: &str,
    arguments: &Map<String, Value>,
) -> String {
    let args = Args::new(arguments);
    let result = match name {
        "task-add" => task_add(store, session, &args).await,
        "task-update" => task_update(store, session, &args).await,
        "task-list" => task_list(store, session).await,
        "task-next" => task_next(store, session).await,
        "note-add" => note_add(store, session, &args).await,
        "note-list" => note_list(store, session, &args).await,
        "iteration-summary" => iteration_summary(store, session, &args).await,
        "session-complete" => session_complete(store, session).await,
        other => Ok(format!("error: Unknown tool: {other}")),
    };

    match result {
        Ok(text) => text,
        Err(err) => {
            debug!(tool = name, error = %err, "Tool call failed");
            format!("error: {err}")
        }
    }
}

async fn task_add<J: Journal>(store: &Store<J>, session: &str, args: &Args<'_>) -> Result<String> {
    let mut drafts = Vec::new();
    for item in args.objects("tasks")? {
        let mut draft = TaskDraft::new(item.str("content")?);
        if let Some(status) = item.opt_str("status")? {
            draft.status = Some(status.parse()?);
        }
        if let Some(priority) = item.opt_int("priority", 0, 4)? {
            draft.priority = Some(priority as u8);
        }
        drafts.push(draft);
    }

    let tasks = store.task_batch_add(session, drafts, None).await?;
    let mut text = format!("Added {} task(s):", tasks.len());
    for task in &tasks {
        text.push_str(&format!("\n  {}: {}", task.id, task.content));
    }
    Ok(text)
}

async fn task_update<J: Journal>(
    store: &Store<J>,
    session: &str,
    args: &Args<'_>,
) -> Result<String> {
    let id = args.str("id")?;
    let status = args.opt_str("status")?;
    let priority = args.opt_int("priority", 0, 4)?;
    let depends_on = args.opt_str("depends_on")?;
    if status.is_none() && priority.is_none() && depends_on.is_none() {
        return Err(iteratr_core::StoreError::Validation(
            "At least one of status, priority, depends_on is required".to_string(),
        ));
    }

    let mut updated: Option<Task> = None;
    let mut parts = Vec::new();
    if let Some(status) = status {
        let status = status.parse()?;
        updated = Some(store.task_status(session, id, status, None).await?);
        parts.push(format!("status={status}"));
    }
    if let Some(priority) = priority {
        updated = Some(
            store
                .task_priority(session, id, priority as u8, None)
                .await?,
        );
        parts.push(format!("priority={priority}"));
    }
    if let Some(depends_on) = depends_on {
        updated = Some(store.task_depends(session, id, depends_on, None).await?);
        parts.push(format!("depends_on={depends_on}"));
    }

    let task = updated.ok_or_else(|| {
        iteratr_core::StoreError::Validation(
            "At least one of status, priority, depends_on is required".to_string(),
        )
    })?;
    Ok(format!("Updated task {}: {}", task.id, parts.join(", ")))
}

async fn task_list<J: Journal>(store: &Store<J>, session: &str) -> Result<String> {
    let groups = store.task_list(session).await?;
    if groups.is_empty() {
        return Ok("No tasks".to_string());
    }
    Ok(render_groups(&groups))
}

fn render_groups(groups: &TaskGroups) -> String {
    let sections: [(&str, &[Task]); 5] = [
        ("Remaining", &groups.remaining),
        ("In Progress", &groups.in_progress),
        ("Completed", &groups.completed),
        ("Blocked", &groups.blocked),
        ("Cancelled", &groups.cancelled),
    ];

    let mut lines = Vec::new();
    for (title, tasks) in sections {
        if tasks.is_empty() {
            continue;
        }
        lines.push(format!("{title}:"));
        for task in tasks {
            lines.push(format!("  [{}] {}", task.id, task.content));
        }
    }
    lines.join("\n")
}

async fn task_next<J: Journal>(store: &Store<J>, session: &str) -> Result<String> {
    match store.task_next(session).await? {
        Some(task) => Ok(json!({
            "id": task.id,
            "content": task.content,
            "priority": task.priority,
            "status": task.status,
        })
        .to_string()),
        None => Ok("No ready tasks".to_string()),
    }
}

async fn note_add<J: Journal>(store: &Store<J>, session: &str, args: &Args<'_>) -> Result<String> {
    // Parse everything up front so a bad element fails before any publish
    let mut pending = Vec::new();
    for item in args.objects("notes")? {
        let content = item.str("content")?.to_string();
        let note_type = item.str("type")?.parse()?;
        pending.push((content, note_type));
    }

    let mut notes = Vec::with_capacity(pending.len());
    for (content, note_type) in pending {
        notes.push(store.note_add(session, &content, note_type, None).await?);
    }

    let mut text = format!("Added {} note(s):", notes.len());
    for note in &notes {
        text.push_str(&format!("\n  {}: {}", note.id, note.content));
    }
    Ok(text)
}

async fn note_list<J: Journal>(store: &Store<J>, session: &str, args: &Args<'_>) -> Result<String> {
    let filter = match args.opt_str("type")? {
        Some(value) => Some(value.parse()?),
        None => None,
    };
    let notes = store.note_list(session, filter).await?;
    if notes.is_empty() {
        return Ok("No notes".to_string());
    }

    let mut lines = vec!["Notes:".to_string()];
    for note in &notes {
        lines.push(format!("  [{}] {}: {}", note.id, note.note_type, note.content));
    }
    Ok(lines.join("\n"))
}

async fn iteration_summary<J: Journal>(
    store: &Store<J>,
    session: &str,
    args: &Args<'_>,
) -> Result<String> {
    let summary = args.str("summary")?;
    let tasks_worked = args.str_list("tasks_worked")?;

    let (outcome, number) = store
        .iteration_summary(session, None, summary, tasks_worked)
        .await?;
    Ok(match outcome {
        SummaryOutcome::Recorded => format!("Summary recorded for iteration {number}"),
        SummaryOutcome::AlreadyRecorded => {
            format!("Summary already recorded for iteration {number}")
        }
    })
}

async fn session_complete<J: Journal>(store: &Store<J>, session: &str) -> Result<String> {
    store.session_complete(session).await?;
    Ok("Session marked complete".to_string())
}
