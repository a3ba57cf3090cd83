//! Durable journal adapter backed by NATS JetStream.
//!
//! Implements the [`iteratr_core::Journal`] trait against an embedded or
//! external JetStream broker. The broker's lifecycle is owned by the
//! surrounding runtime; this crate only speaks the subject/payload contract:
//! stream `iteratr_events` bound to `iteratr.>`, one subject per session and
//! event type.

mod nats;

pub use nats::{JetStreamJournal, STREAM_NAME};
