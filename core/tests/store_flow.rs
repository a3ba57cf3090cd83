//! End-to-end store flows against the in-memory journal: whole-session
//! scenarios and the universal properties every command sequence must keep.

use std::sync::Arc;

use iteratr_core::journal::memory::MemoryJournal;
use iteratr_core::journal::subjects;
use iteratr_core::projection::project;
use iteratr_core::{Journal, Store, TaskDraft, TaskStatus};

fn store() -> Store<MemoryJournal> {
    Store::new(Arc::new(MemoryJournal::new()))
}

#[tokio::test]
async fn full_session_lifecycle() {
    let store = store();

    // Plan out the work
    let tasks = store
        .task_batch_add(
            "lifecycle",
            vec![
                TaskDraft::new("design the schema"),
                TaskDraft::new("implement the parser"),
                TaskDraft::new("write integration tests"),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(tasks.len(), 3);
    store
        .task_depends("lifecycle", "TAS-2", "TAS-1", None)
        .await
        .unwrap();
    store
        .task_depends("lifecycle", "TAS-3", "TAS-2", None)
        .await
        .unwrap();

    // Iteration 1: only the root task is ready
    store.iteration_start("lifecycle", 1).await.unwrap();
    let next = store.task_next("lifecycle").await.unwrap().unwrap();
    assert_eq!(next.id, "TAS-1");
    store
        .task_status("lifecycle", "TAS-1", TaskStatus::InProgress, Some(1))
        .await
        .unwrap();
    store
        .task_status("lifecycle", "TAS-1", TaskStatus::Completed, Some(1))
        .await
        .unwrap();
    store
        .iteration_summary("lifecycle", Some(1), "schema landed", vec!["TAS-1".into()])
        .await
        .unwrap();
    store.iteration_complete("lifecycle", 1).await.unwrap();

    // Iteration 2 unblocks the next task in the chain
    store.iteration_start("lifecycle", 2).await.unwrap();
    let next = store.task_next("lifecycle").await.unwrap().unwrap();
    assert_eq!(next.id, "TAS-2");
    store
        .task_status("lifecycle", "TAS-2", TaskStatus::InProgress, Some(2))
        .await
        .unwrap();
    store
        .task_status("lifecycle", "TAS-2", TaskStatus::Completed, Some(2))
        .await
        .unwrap();

    // Session completion is gated until everything is terminal
    let err = store.session_complete("lifecycle").await.unwrap_err();
    assert!(err.to_string().contains("1 task(s) not in terminal state"));

    store
        .task_status("lifecycle", "TAS-3", TaskStatus::Cancelled, Some(2))
        .await
        .unwrap();
    store.session_complete("lifecycle").await.unwrap();

    let state = store.load("lifecycle").await.unwrap();
    assert!(state.complete);
    assert_eq!(state.current_iteration(), 2);
    assert!(state.iteration(1).unwrap().complete);
    assert!(state.iteration(1).unwrap().task_started);
}

#[tokio::test]
async fn replay_is_deterministic_and_idempotent() {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::new(journal.clone());

    store
        .task_batch_add("det", vec![TaskDraft::new("a"), TaskDraft::new("b")], None)
        .await
        .unwrap();
    store.iteration_start("det", 1).await.unwrap();
    store
        .task_status("det", "TAS-1", TaskStatus::InProgress, Some(1))
        .await
        .unwrap();
    store.set_model("det", "sonnet").await.unwrap();

    let entries = journal.replay(&subjects::session("det")).await.unwrap();
    let first = project("det", &entries);
    let second = project("det", &entries);
    assert_eq!(first, second);

    // Loading through the store observes the same fold
    let loaded = store.load("det").await.unwrap();
    assert_eq!(loaded, first);
}

#[tokio::test]
async fn invariants_hold_after_every_command() {
    let store = store();
    let session = "inv";

    store
        .task_batch_add(
            session,
            vec![TaskDraft::new("a"), TaskDraft::new("b"), TaskDraft::new("c")],
            None,
        )
        .await
        .unwrap();
    store.iteration_start(session, 1).await.unwrap();
    store
        .task_status(session, "TAS-1", TaskStatus::InProgress, Some(1))
        .await
        .unwrap();
    // Conflicting writes are refused, so the fold keeps the invariants
    assert!(store
        .task_status(session, "TAS-2", TaskStatus::InProgress, Some(1))
        .await
        .is_err());
    assert!(store.task_depends(session, "TAS-2", "TAS-2", None).await.is_err());

    let state = store.load(session).await.unwrap();

    // I1: at most one in-progress task
    let in_progress = state
        .tasks
        .values()
        .filter(|t| t.status == TaskStatus::InProgress)
        .count();
    assert_eq!(in_progress, 1);

    // I3: counter equals adds observed
    assert_eq!(state.task_counter as usize, state.tasks.len());

    // I4: no self-dependencies
    for task in state.tasks.values() {
        assert!(!task.depends_on.contains(&task.id));
    }

    // I5: iteration numbers dense from 1
    for (index, iteration) in state.iterations.iter().enumerate() {
        assert_eq!(iteration.number as usize, index + 1);
    }
}

#[tokio::test]
async fn sessions_are_isolated() {
    let store = store();
    store.task_add("one", TaskDraft::new("only in one"), None).await.unwrap();
    store.task_add("two", TaskDraft::new("only in two"), None).await.unwrap();

    let one = store.load("one").await.unwrap();
    let two = store.load("two").await.unwrap();
    assert_eq!(one.tasks.len(), 1);
    assert_eq!(two.tasks.len(), 1);
    assert_eq!(one.tasks["TAS-1"].content, "only in one");
    assert_eq!(two.tasks["TAS-1"].content, "only in two");
}

#[tokio::test]
async fn concurrent_reads_share_one_journal() {
    let journal = Arc::new(MemoryJournal::new());
    let store = Store::new(journal);
    store
        .task_batch_add("conc", vec![TaskDraft::new("a"), TaskDraft::new("b")], None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.load("conc").await.unwrap()
        }));
    }
    let mut states = Vec::new();
    for handle in handles {
        states.push(handle.await.unwrap());
    }
    for state in &states[1..] {
        assert_eq!(state, &states[0]);
    }
}

#[tokio::test]
async fn restart_after_complete_allows_more_work() {
    let store = store();
    store.task_add("again", TaskDraft::new("a"), None).await.unwrap();
    store
        .task_status("again", "TAS-1", TaskStatus::Completed, None)
        .await
        .unwrap();
    store.session_complete("again").await.unwrap();
    assert!(store.load("again").await.unwrap().complete);

    store.session_restart("again").await.unwrap();
    assert!(!store.load("again").await.unwrap().complete);

    let task = store.task_add("again", TaskDraft::new("b"), None).await.unwrap();
    assert_eq!(task.id, "TAS-2");
}
