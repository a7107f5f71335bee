use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{BookEvent, EventPublisher, PublishError};

pub const EVENT_KIND_HEADER: &str = "x-event-kind";

/// POSTs the JSON envelope to an HTTP endpoint.
///
/// The event kind travels in the `x-event-kind` header so receivers can
/// route without parsing the body. Any non-2xx status is a failure.
#[derive(Debug, Clone)]
pub struct WebhookPublisher {
    client: Client,
    url: Url,
}

impl WebhookPublisher {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, PublishError> {
        let url = Url::parse(url).map_err(PublishError::transport)?;
        let client = Client::builder()
            .user_agent(concat!("bookshelf/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(PublishError::transport)?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EventPublisher for WebhookPublisher {
    async fn publish(&self, event: &BookEvent) -> Result<(), PublishError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(EVENT_KIND_HEADER, event.kind.as_str())
            .json(event)
            .send()
            .await
            .map_err(PublishError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "webhook"
    }
}
