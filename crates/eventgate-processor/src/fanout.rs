//! HTTP client for the live-broadcast hub.

use async_trait::async_trait;
use reqwest::Client;

use eventgate_core::broadcast::{BroadcastEvent, BroadcastSink};
use eventgate_core::error::DomainError;

/// Pushes processed events to the broadcast hub's publish route. Any 2xx
/// response is success; everything else is an error the pipeline logs and
/// ignores.
pub struct HttpBroadcastSink {
    client: Client,
    url: String,
}

impl HttpBroadcastSink {
    /// Creates a sink targeting `base_url`'s `/v1/realtime/publish` route.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/v1/realtime/publish", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl BroadcastSink for HttpBroadcastSink {
    async fn publish(&self, event: &BroadcastEvent) -> Result<(), DomainError> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| DomainError::Fanout(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DomainError::Fanout(format!(
                "sink returned {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_publish_route() {
        let sink = HttpBroadcastSink::new("http://realtime:8080/");
        assert_eq!(sink.url, "http://realtime:8080/v1/realtime/publish");

        let sink = HttpBroadcastSink::new("http://realtime:8080");
        assert_eq!(sink.url, "http://realtime:8080/v1/realtime/publish");
    }
}
