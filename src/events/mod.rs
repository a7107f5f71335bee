//! Book change events.
//!
//! Every successful write produces one [`BookEvent`] that is handed to an
//! [`EventPublisher`] on a detached task. Delivery is best effort: a failed
//! publish is logged and counted, and the event is gone.

mod channel;
mod log;
mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::entities::BookRecord;

pub use channel::ChannelPublisher;
pub use log::LogPublisher;
pub use webhook::WebhookPublisher;

pub const DEFAULT_TOPIC: &str = "book_events";

pub const METRIC_EVENTS_PUBLISHED: &str = "bookshelf_events_published_total";
pub const METRIC_EVENTS_FAILED: &str = "bookshelf_events_failed_total";

const SOURCE: &str = "events";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    BookCreated,
    BookUpdated,
    BookDeleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookCreated => "BOOK_CREATED",
            Self::BookUpdated => "BOOK_UPDATED",
            Self::BookDeleted => "BOOK_DELETED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope published for each book change.
///
/// `payload` is the book as returned by the API for creates and updates, and
/// the bare numeric id for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub topic: String,
    pub payload: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

impl BookEvent {
    fn new(kind: EventKind, topic: &str, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            topic: topic.to_string(),
            payload,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn created(topic: &str, record: &BookRecord) -> Self {
        Self::new(EventKind::BookCreated, topic, book_payload(record))
    }

    pub fn updated(topic: &str, record: &BookRecord) -> Self {
        Self::new(EventKind::BookUpdated, topic, book_payload(record))
    }

    pub fn deleted(topic: &str, id: i64) -> Self {
        Self::new(EventKind::BookDeleted, topic, Value::from(id))
    }
}

fn book_payload(record: &BookRecord) -> Value {
    serde_json::json!({
        "id": record.id,
        "title": record.title,
        "author": record.author,
        "year": record.year,
    })
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("event transport failed: {0}")]
    Transport(String),
    #[error("event sink rejected event with status {status}")]
    Rejected { status: u16 },
}

impl PublishError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &BookEvent) -> Result<(), PublishError>;

    fn sink_name(&self) -> &'static str;
}

/// Publish `event` on a detached task. Failures end at the log line.
pub fn emit_detached(publisher: Arc<dyn EventPublisher>, event: BookEvent) {
    tokio::spawn(async move {
        let kind = event.kind.as_str();
        match publisher.publish(&event).await {
            Ok(()) => {
                counter!(METRIC_EVENTS_PUBLISHED, "kind" => kind).increment(1);
                debug!(
                    target = SOURCE,
                    event_id = %event.id,
                    kind,
                    sink = publisher.sink_name(),
                    "Published book event"
                );
            }
            Err(err) => {
                counter!(METRIC_EVENTS_FAILED, "kind" => kind).increment(1);
                warn!(
                    target = SOURCE,
                    event_id = %event.id,
                    kind,
                    sink = publisher.sink_name(),
                    error = %err,
                    "Failed to publish book event"
                );
            }
        }
    });
}
