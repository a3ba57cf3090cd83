use std::collections::BTreeSet;

use async_nats::jetstream::{
    self,
    consumer::{pull, AckPolicy, DeliverPolicy, PullConsumer},
    stream::{Config as StreamConfig, RetentionPolicy, Stream},
};
use async_trait::async_trait;
use futures::StreamExt;
use iteratr_core::error::{Result, StoreError};
use iteratr_core::journal::{subjects, Journal, JournalEntry};
use tracing::debug;

/// Stream binding every `iteratr.>` subject. Retention is limits-based with
/// no caps configured, i.e. keep forever, bounded by disk.
pub const STREAM_NAME: &str = "iteratr_events";

/// Batch size for replay fetches.
const FETCH_BATCH: usize = 256;

/// JetStream implementation of the journal contract.
///
/// FIFO per subject and durability-before-ack are JetStream guarantees; this
/// adapter only maps the trait surface onto stream operations. All handles
/// are cheap clones, so the adapter is freely shareable across tasks.
///
/// # Examples
/// ```rust,no_run
/// use journal::JetStreamJournal;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let journal = JetStreamJournal::connect("nats://127.0.0.1:4222").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JetStreamJournal {
    context: jetstream::Context,
    stream: Stream,
}

impl JetStreamJournal {
    /// Connect to a broker and bind (or create) the event stream.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url).await.map_err(transport)?;
        let context = jetstream::new(client);
        let stream = context
            .get_or_create_stream(StreamConfig {
                name: STREAM_NAME.to_string(),
                subjects: vec![subjects::ALL.to_string()],
                retention: RetentionPolicy::Limits,
                ..Default::default()
            })
            .await
            .map_err(transport)?;

        debug!(url, stream = STREAM_NAME, "Journal stream bound");
        Ok(Self { context, stream })
    }

    /// Ephemeral pull consumer over a subject filter, delivering from the
    /// start of the stream.
    async fn replay_consumer(&self, filter: &str) -> Result<PullConsumer> {
        self.stream
            .create_consumer(pull::Config {
                filter_subject: filter.to_string(),
                deliver_policy: DeliverPolicy::All,
                ack_policy: AckPolicy::None,
                ..Default::default()
            })
            .await
            .map_err(transport)
    }
}

#[async_trait]
impl Journal for JetStreamJournal {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<u64> {
        let ack = self
            .context
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(transport)?
            .await
            .map_err(transport)?;
        Ok(ack.sequence)
    }

    async fn replay(&self, filter: &str) -> Result<Vec<JournalEntry>> {
        let mut consumer = self.replay_consumer(filter).await?;
        let mut pending = consumer.info().await.map_err(transport)?.num_pending;

        let mut entries = Vec::with_capacity(pending as usize);
        while pending > 0 {
            let batch = (pending as usize).min(FETCH_BATCH);
            let mut messages = consumer
                .fetch()
                .max_messages(batch)
                .messages()
                .await
                .map_err(transport)?;

            let mut received = 0u64;
            while let Some(message) = messages.next().await {
                let message = message.map_err(transport)?;
                let sequence = message
                    .info()
                    .map_err(transport)?
                    .stream_sequence;
                entries.push(JournalEntry {
                    sequence,
                    payload: message.payload.to_vec(),
                    published_at: None,
                });
                received += 1;
            }
            if received == 0 {
                // The broker reported pending messages but delivered none;
                // stop rather than spin
                break;
            }
            pending = pending.saturating_sub(received);
        }

        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn purge(&self, filter: &str) -> Result<()> {
        self.stream
            .purge()
            .filter(filter)
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        // Subject scan: replay headers only come with payloads, so read the
        // stream's subject map via a filtered info request.
        let mut stream = self.stream.clone();
        let info = stream
            .info_with_subjects(subjects::ALL)
            .await
            .map_err(transport)?;

        let mut sessions = BTreeSet::new();
        futures::pin_mut!(info);
        while let Some(subject) = info.next().await {
            let (subject, _count) = subject.map_err(transport)?;
            if let Some(session) = subjects::session_of(&subject) {
                sessions.insert(session.to_string());
            }
        }
        Ok(sessions.into_iter().collect())
    }
}

fn transport<E: std::fmt::Display>(err: E) -> StoreError {
    StoreError::Transport(err.to_string())
}
