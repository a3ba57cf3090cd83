//! Session control commands.

use tracing::info;

use crate::error::{Result, StoreError};
use crate::event::{actions, Event, EventType};
use crate::journal::Journal;
use crate::store::{validate_session_name, Store};

impl<J: Journal> Store<J> {
    /// Mark the session complete. Succeeds only when every task holds a
    /// terminal status; the error carries the count of offending tasks.
    /// Idempotent: completing an already-complete session succeeds again.
    pub async fn session_complete(&self, session: &str) -> Result<()> {
        let state = self.load(session).await?;
        let remaining = state.non_terminal_count();
        if remaining > 0 {
            return Err(StoreError::tasks_not_terminal(remaining));
        }

        let event = Event::new(session, EventType::Control, actions::SESSION_COMPLETE);
        self.append(&event).await?;
        info!(session, "Session marked complete");
        Ok(())
    }

    /// Reopen a completed session. Emits the restart event unconditionally.
    pub async fn session_restart(&self, session: &str) -> Result<()> {
        validate_session_name(session)?;
        let event = Event::new(session, EventType::Control, actions::SESSION_RESTART);
        self.append(&event).await?;
        info!(session, "Session restarted");
        Ok(())
    }

    /// Record the model last used to drive the session.
    pub async fn set_model(&self, session: &str, model: &str) -> Result<()> {
        validate_session_name(session)?;
        let model = model.trim();
        if model.is_empty() {
            return Err(StoreError::empty_field("model"));
        }

        let event = Event::new(session, EventType::Control, actions::SET_MODEL)
            .with_data(model);
        self.append(&event).await?;
        Ok(())
    }
}
