//! Iteration commands.

use tracing::info;

use crate::error::{Result, StoreError};
use crate::event::{actions, Event, EventType};
use crate::journal::Journal;
use crate::models::{Iteration, SummaryOutcome};
use crate::store::Store;

impl<J: Journal> Store<J> {
    /// Begin an iteration. Numbers are dense and increasing: the next valid
    /// number is always `max(existing) + 1`, or 1 for a fresh session.
    pub async fn iteration_start(&self, session: &str, number: u32) -> Result<Iteration> {
        let state = self.load(session).await?;
        let expected = state.current_iteration() + 1;
        if number != expected {
            return Err(StoreError::Conflict(format!(
                "Iteration number must be {expected}, got {number}"
            )));
        }

        let event = Event::new(session, EventType::Iteration, actions::START)
            .with_meta("number", number);
        self.append(&event).await?;

        info!(session, iteration = number, "Iteration started");
        Ok(Iteration::started(number, event.timestamp))
    }

    /// Mark an iteration complete.
    pub async fn iteration_complete(&self, session: &str, number: u32) -> Result<Iteration> {
        let state = self.load(session).await?;
        let Some(existing) = state.iteration(number) else {
            return Err(StoreError::not_found("Iteration", &number.to_string()));
        };

        let event = Event::new(session, EventType::Iteration, actions::COMPLETE)
            .with_meta("number", number);
        self.append(&event).await?;

        info!(session, iteration = number, "Iteration completed");
        let mut iteration = existing.clone();
        iteration.complete = true;
        iteration.ended_at = Some(event.timestamp);
        Ok(iteration)
    }

    /// Record the summary for an iteration, at most once. A second call for
    /// the same iteration is a no-op reported as [`SummaryOutcome::AlreadyRecorded`]
    /// rather than an error.
    ///
    /// `number` defaults to the current iteration when `None`.
    pub async fn iteration_summary(
        &self,
        session: &str,
        number: Option<u32>,
        summary: &str,
        tasks_worked: Vec<String>,
    ) -> Result<(SummaryOutcome, u32)> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(StoreError::empty_field("summary"));
        }

        let state = self.load(session).await?;
        let number = number.unwrap_or_else(|| state.current_iteration());
        let Some(existing) = state.iteration(number) else {
            return Err(StoreError::not_found("Iteration", &number.to_string()));
        };
        if existing.summary.is_some() {
            return Ok((SummaryOutcome::AlreadyRecorded, number));
        }

        let event = Event::new(session, EventType::Iteration, actions::SUMMARY)
            .with_data(summary)
            .with_meta("number", number)
            .with_meta("tasks_worked", serde_json::Value::from(tasks_worked));
        self.append(&event).await?;

        info!(session, iteration = number, "Iteration summary recorded");
        Ok((SummaryOutcome::Recorded, number))
    }
}
