//! Kafka producer for accepted envelopes.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use eventgate_core::envelope::InflightEvent;
use eventgate_core::error::DomainError;
use eventgate_core::publish::EventPublisher;
use eventgate_telemetry::propagation;

/// Publishes inflight records to the raw events topic. A returned `Ok`
/// implies the broker acknowledged the write across the in-sync replica set.
pub struct KafkaEventPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaEventPublisher {
    /// Creates the producer with broker-side idempotence and full-ISR acks.
    ///
    /// # Errors
    ///
    /// Returns `KafkaError` if the client configuration is rejected.
    pub fn new(bootstrap_servers: &str, topic: &str) -> Result<Self, KafkaError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("message.timeout.ms", "10000")
            .create()?;
        Ok(Self {
            producer,
            topic: topic.to_owned(),
        })
    }

    /// Flushes queued records, bounded by `timeout`. Called on shutdown.
    pub fn flush(&self, timeout: Duration) {
        if let Err(error) = self.producer.flush(Timeout::After(timeout)) {
            tracing::warn!(%error, "failed to flush producer during shutdown");
        }
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish(&self, record: &InflightEvent) -> Result<(), DomainError> {
        let payload = serde_json::to_vec(record)
            .map_err(|e| DomainError::Publish(format!("failed to encode inflight record: {e}")))?;
        let key = record.partition_key();

        let carrier = propagation::inject_current_context();
        let mut headers = OwnedHeaders::new();
        for (name, value) in carrier.pairs() {
            headers = headers.insert(Header {
                key: name,
                value: Some(value.as_bytes()),
            });
        }

        let delivery = self
            .producer
            .send(
                FutureRecord::to(&self.topic)
                    .key(&key)
                    .payload(&payload)
                    .headers(headers),
                Timeout::After(Duration::from_secs(10)),
            )
            .await;

        match delivery {
            Ok((partition, offset)) => {
                tracing::debug!(partition, offset, "record enqueued");
                Ok(())
            }
            Err((error, _)) => Err(DomainError::Publish(error.to_string())),
        }
    }
}
