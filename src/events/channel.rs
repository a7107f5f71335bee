use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{BookEvent, EventPublisher, PublishError};

/// In-process fan-out over a broadcast channel.
///
/// Publishing with no live subscribers succeeds; the event is dropped.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: broadcast::Sender<BookEvent>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, event: &BookEvent) -> Result<(), PublishError> {
        let _ = self.sender.send(event.clone());
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "channel"
    }
}
