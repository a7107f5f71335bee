use async_trait::async_trait;
use tracing::info;

use super::{BookEvent, EventPublisher, PublishError};

/// Writes each event to the log as structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &BookEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event.payload)?;
        info!(
            target = "bookshelf::events",
            event_id = %event.id,
            topic = %event.topic,
            kind = event.kind.as_str(),
            payload = %payload,
            "Book event"
        );
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "log"
    }
}
