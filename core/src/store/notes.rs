//! Note commands.

use tracing::info;

use crate::error::{Result, StoreError};
use crate::event::{actions, Event, EventType};
use crate::journal::Journal;
use crate::models::{Note, NoteType};
use crate::store::{resolve_iteration, Store};

impl<J: Journal> Store<J> {
    /// Record a note against the session.
    pub async fn note_add(
        &self,
        session: &str,
        content: &str,
        note_type: NoteType,
        iteration: Option<u32>,
    ) -> Result<Note> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::empty_field("content"));
        }

        let state = self.load(session).await?;
        let iteration = resolve_iteration(&state, iteration);
        let id = format!("NOT-{}", state.note_counter + 1);

        let event = Event::new(session, EventType::Note, actions::ADD)
            .with_id(&id)
            .with_data(content)
            .with_meta("type", note_type.as_str())
            .with_meta("iteration", iteration);
        self.append(&event).await?;

        info!(session, note = %id, kind = %note_type, "Note added");
        Ok(Note {
            id,
            content: content.to_string(),
            note_type,
            created_at: event.timestamp,
            iteration,
        })
    }

    /// All notes in creation order, optionally filtered by type.
    pub async fn note_list(
        &self,
        session: &str,
        note_type: Option<NoteType>,
    ) -> Result<Vec<Note>> {
        let state = self.load(session).await?;
        Ok(match note_type {
            Some(filter) => state
                .notes
                .into_iter()
                .filter(|n| n.note_type == filter)
                .collect(),
            None => state.notes,
        })
    }
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
    async fn test_note_ids_are_sequential() {
        let store = store();
        let a = store
            .note_add("demo", "tests run with --workspace", NoteType::Tip, None)
            .await
            .unwrap();
        let b = store
            .note_add("demo", "sqlite locks under load", NoteType::Learning, None)
            .await
            .unwrap();
        assert_eq!(a.id, "NOT-1");
        assert_eq!(b.id, "NOT-2");
    }

    #[tokio::test]
    async fn test_note_content_required() {
        let store = store();
        let err = store
            .note_add("demo", "  ", NoteType::Tip, None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_note_list_filters_by_type() {
        let store = store();
        store
            .note_add("demo", "a learning", NoteType::Learning, None)
            .await
            .unwrap();
        store
            .note_add("demo", "a decision", NoteType::Decision, None)
            .await
            .unwrap();

        let all = store.note_list("demo", None).await.unwrap();
        assert_eq!(all.len(), 2);

        let decisions = store
            .note_list("demo", Some(NoteType::Decision))
            .await
            .unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].content, "a decision");
    }

    #[tokio::test]
    async fn test_note_records_current_iteration() {
        let store = store();
        store.iteration_start("demo", 1).await.unwrap();
        let note = store
            .note_add("demo", "mid-iteration note", NoteType::Stuck, None)
            .await
            .unwrap();
        assert_eq!(note.iteration, 1);
    }
}
