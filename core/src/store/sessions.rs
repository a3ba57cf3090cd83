//! Cross-session commands: enumeration and reset.

use tracing::{info, warn};

use crate::error::Result;
use crate::journal::{subjects, Journal};
use crate::models::SessionSummary;
use crate::store::{validate_session_name, Store};

impl<J: Journal> Store<J> {
    /// Summaries for every session known to the journal, most recently
    /// active first. A session whose load fails is skipped with a warning
    /// rather than failing the whole listing.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let names = self.journal().list_sessions().await?;

        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            match self.load(&name).await {
                Ok(state) => summaries.push(SessionSummary::from_state(&state)),
                Err(err) => warn!(session = %name, error = %err, "Skipping unloadable session"),
            }
        }

        summaries.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summaries)
    }

    /// Purge every event for a session. Irreversible.
    pub async fn reset_session(&self, session: &str) -> Result<()> {
        validate_session_name(session)?;
        self.journal().purge(&subjects::session(session)).await?;
        info!(session, "Session reset");
        Ok(())
    }
}
