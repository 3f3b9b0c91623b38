//! Per-message processing pipeline.
//!
//! One record moves through decode → validate → persist → fan-out and ends
//! in exactly one terminal state: committed (processed, duplicate, or
//! dead-lettered) or retried. Only a failed dead-letter write retries; every
//! other failure terminates with a committed offset so a poison message
//! cannot loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use eventgate_core::broadcast::{BroadcastEvent, BroadcastSink};
use eventgate_core::clock::{self, Clock};
use eventgate_core::envelope::InflightEvent;
use eventgate_core::store::{DeadLetterEntry, EventStore, PersistOutcome};
use eventgate_telemetry::names;

/// Terminal disposition of one log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Persisted and fanned out.
    Processed,
    /// Already processed; nothing written, no fan-out.
    Duplicate,
    /// Routed to the dead-letter table.
    DeadLettered,
}

/// What the consumer loop should do with the record's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Commit the offset; the record reached a terminal state.
    Commit(Disposition),
    /// Do not commit; the record must be re-polled.
    Retry,
}

/// Drives raw log records to their terminal state.
pub struct Pipeline {
    store: Arc<dyn EventStore>,
    sink: Option<Arc<dyn BroadcastSink>>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Creates a pipeline over the given store, optional sink, and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        sink: Option<Arc<dyn BroadcastSink>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, sink, clock }
    }

    /// Processes one raw record through to a terminal outcome.
    pub async fn process(&self, raw: &[u8]) -> StepOutcome {
        let text = String::from_utf8_lossy(raw).into_owned();

        let record: InflightEvent = match serde_json::from_slice(raw) {
            Ok(record) => record,
            Err(error) => {
                return self
                    .dead_letter(&text, None, &format!("invalid-json: {error}"))
                    .await;
            }
        };

        if let Err(reason) = validate_record(&record) {
            let tenant_id = non_empty(&record.envelope.tenant_id);
            return self.dead_letter(&text, tenant_id, &reason).await;
        }

        let now = self.clock.now();
        match self.store.persist(&record, now).await {
            Ok(PersistOutcome::Duplicate) => {
                info!(event_id = %record.envelope.event_id, "duplicate event skipped");
                StepOutcome::Commit(Disposition::Duplicate)
            }
            Ok(PersistOutcome::Processed) => {
                observe_persist(&record, now);
                self.fan_out(&record, now).await;
                StepOutcome::Commit(Disposition::Processed)
            }
            Err(error) => {
                let tenant_id = non_empty(&record.envelope.tenant_id);
                self.dead_letter(&text, tenant_id, &error.to_string()).await
            }
        }
    }

    async fn dead_letter(
        &self,
        raw: &str,
        tenant_id: Option<String>,
        reason: &str,
    ) -> StepOutcome {
        let entry = DeadLetterEntry::from_raw(raw, tenant_id, reason, self.clock.now());
        match self.store.write_dead_letter(&entry).await {
            Ok(()) => {
                warn!(reason = %entry.reason, "event routed to dead letter");
                StepOutcome::Commit(Disposition::DeadLettered)
            }
            Err(error) => {
                warn!(%error, "dead-letter write failed; record will be re-polled");
                StepOutcome::Retry
            }
        }
    }

    /// Best-effort push to live subscribers; failures are logged and the
    /// message is not retried.
    async fn fan_out(&self, record: &InflightEvent, processed_at_utc: DateTime<Utc>) {
        let Some(sink) = &self.sink else { return };
        let received_at_utc = record.received_at_utc.unwrap_or(processed_at_utc);
        let event = BroadcastEvent::project(record, received_at_utc, processed_at_utc);
        if let Err(error) = sink.publish(&event).await {
            warn!(event_id = %record.envelope.event_id, %error, "broadcast fan-out failed");
        }
    }
}

/// Structural checks the gateway does not enforce.
fn validate_record(record: &InflightEvent) -> Result<(), String> {
    if Uuid::parse_str(&record.envelope.event_id).is_err() {
        return Err(format!(
            "eventId is not a valid UUID: {}",
            record.envelope.event_id
        ));
    }
    for (name, value) in [
        ("tenantId", &record.envelope.tenant_id),
        ("source", &record.envelope.source),
        ("type", &record.envelope.event_type),
        ("streamKey", &record.envelope.stream_key),
        ("idempotencyKey", &record.idempotency_key),
    ] {
        if value.trim().is_empty() {
            return Err(format!("{name} must not be empty"));
        }
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_owned())
}

/// Lag and freshness observations for the record that just persisted.
fn observe_persist(record: &InflightEvent, now: DateTime<Utc>) {
    let lag = clock::seconds_between(record.envelope.timestamp_utc, now);
    metrics::gauge!(names::PROCESSOR_LAG_SECONDS).set(lag);

    if let Some(received) = record.received_at_utc {
        metrics::histogram!(names::END_TO_END_FRESHNESS_SECONDS)
            .record(clock::seconds_between(received, now));
    }
}

/// Records the terminal outcome counters. Duplicates count as success.
pub fn record_outcome(outcome: StepOutcome) {
    let result = match outcome {
        StepOutcome::Commit(Disposition::Processed | Disposition::Duplicate) => "success",
        StepOutcome::Commit(Disposition::DeadLettered) => "dlq",
        StepOutcome::Retry => "retry",
    };
    metrics::counter!(names::PROCESSOR_EVENTS_TOTAL, "result" => result).increment(1);
    if result == "dlq" {
        metrics::counter!(names::DLQ_EVENTS_TOTAL).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    use eventgate_core::envelope::EventEnvelope;
    use eventgate_test_support::{FailingStore, FixedClock, RecordingSink, RecordingStore};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 26, 14, 22, 40).unwrap()
    }

    fn valid_record() -> InflightEvent {
        InflightEvent {
            envelope: EventEnvelope {
                event_id: "8f86a6a7-18a1-4463-8578-16eb2cca2727".to_owned(),
                tenant_id: "contoso".to_owned(),
                source: "orders-api".to_owned(),
                event_type: "OrderCreated".to_owned(),
                timestamp_utc: Utc.with_ymd_and_hms(2026, 2, 26, 14, 22, 31).unwrap(),
                schema_version: 1,
                stream_key: "order-184922".to_owned(),
                payload: serde_json::json!({"orderId": "184922", "amount": 83.12}),
            },
            idempotency_key: "demo-1".to_owned(),
            payload_hash: "0a".repeat(32),
            received_at_utc: Some(Utc.with_ymd_and_hms(2026, 2, 26, 14, 22, 35).unwrap()),
            trace_id: "0af7651916cd43dd8448eb211c80319c".to_owned(),
        }
    }

    fn dead_letter_reason(store: &RecordingStore) -> String {
        store.dead_letters()[0].reason.clone()
    }

    fn pipeline_with(
        store: Arc<RecordingStore>,
        sink: Option<Arc<RecordingSink>>,
    ) -> Pipeline {
        Pipeline::new(
            store,
            sink.map(|s| s as Arc<dyn BroadcastSink>),
            Arc::new(FixedClock(fixed_now())),
        )
    }

    #[tokio::test]
    async fn test_process_persists_and_fans_out() {
        // Arrange
        let store = Arc::new(RecordingStore::new());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = pipeline_with(store.clone(), Some(sink.clone()));
        let raw = serde_json::to_vec(&valid_record()).unwrap();

        // Act
        let outcome = pipeline.process(&raw).await;

        // Assert
        assert_eq!(outcome, StepOutcome::Commit(Disposition::Processed));

        let persisted = store.persisted();
        assert_eq!(persisted.len(), 1);
        let (record, now) = &persisted[0];
        assert_eq!(record.envelope.event_id, "8f86a6a7-18a1-4463-8578-16eb2cca2727");
        assert_eq!(*now, fixed_now());

        let received = sink.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].event_id, "8f86a6a7-18a1-4463-8578-16eb2cca2727");
        assert_eq!(received[0].processed_at_utc, fixed_now());
        assert_eq!(
            received[0].received_at_utc,
            Utc.with_ymd_and_hms(2026, 2, 26, 14, 22, 35).unwrap()
        );
        assert_eq!(received[0].trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert!(store.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_process_duplicate_commits_without_fan_out() {
        // Arrange
        let store = Arc::new(RecordingStore::new());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = pipeline_with(store.clone(), Some(sink.clone()));
        let raw = serde_json::to_vec(&valid_record()).unwrap();

        // Act
        let first = pipeline.process(&raw).await;
        let second = pipeline.process(&raw).await;

        // Assert
        assert_eq!(first, StepOutcome::Commit(Disposition::Processed));
        assert_eq!(second, StepOutcome::Commit(Disposition::Duplicate));
        assert_eq!(store.persisted().len(), 1);
        assert_eq!(sink.received().len(), 1);
    }

    #[tokio::test]
    async fn test_process_invalid_json_dead_letters_with_wrapped_snapshot() {
        // Arrange
        let store = Arc::new(RecordingStore::new());
        let pipeline = pipeline_with(store.clone(), None);

        // Act
        let outcome = pipeline.process(b"not json at all").await;

        // Assert
        assert_eq!(outcome, StepOutcome::Commit(Disposition::DeadLettered));

        let dead_letters = store.dead_letters();
        assert_eq!(dead_letters.len(), 1);
        let entry = &dead_letters[0];
        assert_eq!(entry.tenant_id, None);
        assert!(entry.reason.starts_with("invalid-json:"));
        assert_eq!(
            entry.event_snapshot,
            serde_json::json!({"raw": "not json at all"})
        );
        assert!(store.persisted().is_empty());
    }

    #[tokio::test]
    async fn test_process_non_uuid_event_id_dead_letters_with_tenant() {
        // Arrange
        let store = Arc::new(RecordingStore::new());
        let pipeline = pipeline_with(store.clone(), None);
        let mut record = valid_record();
        record.envelope.event_id = "not-a-uuid".to_owned();
        let raw = serde_json::to_vec(&record).unwrap();

        // Act
        let outcome = pipeline.process(&raw).await;

        // Assert
        assert_eq!(outcome, StepOutcome::Commit(Disposition::DeadLettered));

        let dead_letters = store.dead_letters();
        assert_eq!(dead_letters.len(), 1);
        assert_eq!(dead_letters[0].tenant_id.as_deref(), Some("contoso"));
        assert!(dead_letters[0].reason.contains("eventId is not a valid UUID"));
        // The snapshot keeps the decoded record verbatim.
        assert_eq!(dead_letters[0].event_snapshot["eventId"], "not-a-uuid");
        assert!(store.persisted().is_empty());
    }

    #[tokio::test]
    async fn test_process_empty_idempotency_key_dead_letters() {
        let store = Arc::new(RecordingStore::new());
        let pipeline = pipeline_with(store.clone(), None);
        let mut record = valid_record();
        record.idempotency_key = String::new();
        let raw = serde_json::to_vec(&record).unwrap();

        let outcome = pipeline.process(&raw).await;

        assert_eq!(outcome, StepOutcome::Commit(Disposition::DeadLettered));
        assert!(dead_letter_reason(&store).contains("idempotencyKey"));
    }

    #[tokio::test]
    async fn test_process_persist_failure_dead_letters_with_reason() {
        // Arrange
        let store = Arc::new(RecordingStore::failing_persist());
        let pipeline = pipeline_with(store.clone(), None);
        let raw = serde_json::to_vec(&valid_record()).unwrap();

        // Act
        let outcome = pipeline.process(&raw).await;

        // Assert
        assert_eq!(outcome, StepOutcome::Commit(Disposition::DeadLettered));
        assert!(dead_letter_reason(&store).contains("persistence error"));
    }

    #[tokio::test]
    async fn test_process_retries_when_dead_letter_write_fails() {
        // Arrange
        let store = Arc::new(RecordingStore::failing_dead_letter());
        let pipeline = pipeline_with(store.clone(), None);
        let raw = serde_json::to_vec(&valid_record()).unwrap();

        // Act
        let outcome = pipeline.process(&raw).await;

        // Assert
        assert_eq!(outcome, StepOutcome::Retry);
        assert!(store.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_process_retries_when_store_is_down() {
        // Arrange
        let pipeline = Pipeline::new(
            Arc::new(FailingStore),
            None,
            Arc::new(FixedClock(fixed_now())),
        );
        let raw = serde_json::to_vec(&valid_record()).unwrap();

        // Act
        let outcome = pipeline.process(&raw).await;

        // Assert — persist fails and the dead-letter write fails too, so
        // the record must be re-polled rather than committed.
        assert_eq!(outcome, StepOutcome::Retry);
    }

    #[tokio::test]
    async fn test_process_fan_out_failure_still_commits() {
        // Arrange
        let store = Arc::new(RecordingStore::new());
        let sink = Arc::new(RecordingSink::failing());
        let pipeline = pipeline_with(store.clone(), Some(sink));
        let raw = serde_json::to_vec(&valid_record()).unwrap();

        // Act
        let outcome = pipeline.process(&raw).await;

        // Assert
        assert_eq!(outcome, StepOutcome::Commit(Disposition::Processed));
        assert_eq!(store.persisted().len(), 1);
        assert!(store.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn test_process_without_sink_persists_normally() {
        let store = Arc::new(RecordingStore::new());
        let pipeline = pipeline_with(store.clone(), None);
        let raw = serde_json::to_vec(&valid_record()).unwrap();

        let outcome = pipeline.process(&raw).await;

        assert_eq!(outcome, StepOutcome::Commit(Disposition::Processed));
        assert_eq!(store.persisted().len(), 1);
    }

    #[tokio::test]
    async fn test_process_missing_received_at_uses_persist_time_in_fan_out() {
        // Arrange
        let store = Arc::new(RecordingStore::new());
        let sink = Arc::new(RecordingSink::new());
        let pipeline = pipeline_with(store.clone(), Some(sink.clone()));
        let mut record = valid_record();
        record.received_at_utc = None;
        let raw = serde_json::to_vec(&record).unwrap();

        // Act
        pipeline.process(&raw).await;

        // Assert
        let received = sink.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].received_at_utc, fixed_now());
    }

    #[test]
    fn test_validate_record_accepts_canonical_uuid() {
        assert!(validate_record(&valid_record()).is_ok());
    }
}
