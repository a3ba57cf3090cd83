//! Inbox commands. Messages are addressed by opaque tokens rather than
//! counter IDs.

use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::event::{actions, Event, EventType};
use crate::journal::Journal;
use crate::models::InboxMessage;
use crate::resolve::{resolve_id, INBOX_PREFIX_MIN};
use crate::store::{validate_session_name, Store};

impl<J: Journal> Store<J> {
    /// Leave a message for the agent. The ID is a 32-character token.
    pub async fn inbox_add(&self, session: &str, content: &str) -> Result<InboxMessage> {
        validate_session_name(session)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::empty_field("content"));
        }

        let id = Uuid::new_v4().simple().to_string();
        let event = Event::new(session, EventType::Inbox, actions::ADD)
            .with_id(&id)
            .with_data(content);
        self.append(&event).await?;

        info!(session, message = %id, "Inbox message added");
        Ok(InboxMessage {
            id,
            content: content.to_string(),
            read: false,
            created_at: event.timestamp,
        })
    }

    /// Unread messages in arrival order.
    pub async fn inbox_list(&self, session: &str) -> Result<Vec<InboxMessage>> {
        let state = self.load(session).await?;
        Ok(state.inbox.into_iter().filter(|m| !m.read).collect())
    }

    /// Mark a message read, resolving by exact ID or unique prefix of at
    /// least 8 characters. Reading is monotonic; marking an already-read
    /// message again is harmless.
    pub async fn inbox_mark_read(&self, session: &str, query: &str) -> Result<InboxMessage> {
        let state = self.load(session).await?;
        let id = resolve_id(
            state.inbox.iter().map(|m| m.id.as_str()),
            query,
            INBOX_PREFIX_MIN,
            "Message",
        )?;

        let Some(found) = state.inbox.into_iter().find(|m| m.id == id) else {
            return Err(StoreError::not_found("Message", &id));
        };

        let event = Event::new(session, EventType::Inbox, actions::MARK_READ)
            .with_meta("message_id", id.as_str());
        self.append(&event).await?;

        let mut message = found;
        message.read = true;
        Ok(message)
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
    async fn test_inbox_ids_are_opaque_tokens() {
        let store = store();
        let message = store.inbox_add("demo", "look at the flaky test").await.unwrap();
        assert!(message.id.len() >= 16);
        assert!(!message.read);
    }

    #[tokio::test]
    async fn test_inbox_list_returns_unread_only() {
        let store = store();
        let first = store.inbox_add("demo", "one").await.unwrap();
        store.inbox_add("demo", "two").await.unwrap();

        store.inbox_mark_read("demo", &first.id).await.unwrap();
        let unread = store.inbox_list("demo").await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].content, "two");
    }

    #[tokio::test]
    async fn test_mark_read_by_prefix() {
        let store = store();
        let message = store.inbox_add("demo", "hello").await.unwrap();
        let prefix = &message.id[..INBOX_PREFIX_MIN];

        let marked = store.inbox_mark_read("demo", prefix).await.unwrap();
        assert_eq!(marked.id, message.id);
        assert!(marked.read);

        let err = store.inbox_mark_read("demo", "short").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_mark_read_unknown_message() {
        let store = store();
        store.inbox_add("demo", "hello").await.unwrap();
        let err = store
            .inbox_mark_read("demo", "ffffffffffffffff")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mark_read_is_monotonic() {
        let store = store();
        let message = store.inbox_add("demo", "hello").await.unwrap();
        store.inbox_mark_read("demo", &message.id).await.unwrap();
        let again = store.inbox_mark_read("demo", &message.id).await.unwrap();
        assert!(again.read);
        assert!(store.inbox_list("demo").await.unwrap().is_empty());
    }
}
