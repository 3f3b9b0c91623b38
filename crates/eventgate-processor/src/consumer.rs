//! The log consumer loop.
//!
//! One loop owns one subscription and handles records sequentially; that,
//! together with the producer's `tenantId|streamKey` partition key, is what
//! preserves per-stream ordering end-to-end.

use std::time::Duration;

use rdkafka::Offset;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Headers, Message};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use eventgate_telemetry::propagation::{self, HeaderCarrier};

use crate::pipeline::{self, Pipeline, StepOutcome};

/// Delay before re-polling a record whose dead-letter write failed.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Creates the stream consumer: stable group identity, manual commits,
/// earliest starting offset for fresh groups.
///
/// # Errors
///
/// Returns `KafkaError` if the client configuration is rejected.
pub fn create_consumer(
    bootstrap_servers: &str,
    group_id: &str,
) -> Result<StreamConsumer, KafkaError> {
    ClientConfig::new()
        .set("bootstrap.servers", bootstrap_servers)
        .set("group.id", group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", "6000")
        .create()
}

/// Runs the consumer loop until `shutdown` fires. Each record reaches a
/// terminal state before its offset is committed; a `Retry` outcome seeks
/// the partition back so the record is re-polled.
///
/// # Errors
///
/// Returns `KafkaError` if the subscription cannot be established.
pub async fn run(
    consumer: StreamConsumer,
    pipeline: Pipeline,
    topic: &str,
    shutdown: CancellationToken,
) -> Result<(), KafkaError> {
    consumer.subscribe(&[topic])?;
    info!(topic, "consumer subscribed");

    loop {
        let message = tokio::select! {
            () = shutdown.cancelled() => break,
            result = consumer.recv() => match result {
                Ok(message) => message,
                Err(error) => {
                    warn!(%error, "consumer poll failed");
                    continue;
                }
            },
        };

        let span = tracing::info_span!(
            "process_record",
            topic = message.topic(),
            partition = message.partition(),
            offset = message.offset(),
        );
        span.set_parent(extract_parent_context(&message));

        let raw = message.payload().unwrap_or_default();
        let outcome = pipeline.process(raw).instrument(span).await;
        pipeline::record_outcome(outcome);

        match outcome {
            StepOutcome::Commit(_) => {
                if let Err(error) = consumer.commit_message(&message, CommitMode::Sync) {
                    error!(%error, "offset commit failed");
                }
            }
            StepOutcome::Retry => {
                if let Err(error) = consumer.seek(
                    message.topic(),
                    message.partition(),
                    Offset::Offset(message.offset()),
                    Duration::from_secs(5),
                ) {
                    error!(%error, "seek for retry failed");
                }
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }

    info!("consumer loop stopped");
    Ok(())
}

/// Reads W3C trace-context pairs out of the record headers so the
/// per-record span continues the producer's trace.
fn extract_parent_context(message: &BorrowedMessage<'_>) -> opentelemetry::Context {
    let pairs = message.headers().into_iter().flat_map(|headers| {
        headers.iter().filter_map(|header| {
            let value = header.value.and_then(|v| std::str::from_utf8(v).ok())?;
            Some((header.key.to_owned(), value.to_owned()))
        })
    });
    propagation::extract_context(&HeaderCarrier::from_pairs(pairs))
}
