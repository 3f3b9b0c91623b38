//! PostgreSQL implementation of the `EventStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use eventgate_core::envelope::InflightEvent;
use eventgate_core::error::DomainError;
use eventgate_core::store::{DeadLetterEntry, EventStore, PersistOutcome};

const INSERT_PROCESSED_SQL: &str = r"
INSERT INTO processed_events (event_id, tenant_id, idempotency_key, processed_utc)
VALUES ($1, $2, $3, $4)
ON CONFLICT (event_id) DO NOTHING
";

const INSERT_EVENT_SQL: &str = r"
INSERT INTO events (
    event_id, tenant_id, source, event_type, stream_key,
    timestamp_utc, schema_version, payload,
    received_utc, processed_utc, trace_id, idempotency_key
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
";

const UPSERT_STREAM_STATE_SQL: &str = r"
INSERT INTO stream_state (tenant_id, stream_key, last_seen_utc, last_type, last_payload)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (tenant_id, stream_key)
DO UPDATE SET
    last_seen_utc = EXCLUDED.last_seen_utc,
    last_type     = EXCLUDED.last_type,
    last_payload  = EXCLUDED.last_payload
";

const INSERT_DEAD_LETTER_SQL: &str = r"
INSERT INTO dead_letter (id, tenant_id, event_snapshot, reason, created_utc)
VALUES ($1, $2, $3, $4, $5)
";

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn persist(
        &self,
        record: &InflightEvent,
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome, DomainError> {
        let event_id = Uuid::parse_str(&record.envelope.event_id)
            .map_err(|e| DomainError::Validation(format!("eventId is not a valid UUID: {e}")))?;
        let received_utc = record.received_at_utc.unwrap_or(now);

        let mut tx = self.pool.begin().await.map_err(persistence)?;

        // The dedup barrier: a replayed record collapses here, inside the
        // same transaction that would otherwise write the event row.
        let inserted = sqlx::query(INSERT_PROCESSED_SQL)
            .bind(event_id)
            .bind(&record.envelope.tenant_id)
            .bind(&record.idempotency_key)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?
            .rows_affected();

        if inserted == 0 {
            tx.commit().await.map_err(persistence)?;
            return Ok(PersistOutcome::Duplicate);
        }

        sqlx::query(INSERT_EVENT_SQL)
            .bind(event_id)
            .bind(&record.envelope.tenant_id)
            .bind(&record.envelope.source)
            .bind(&record.envelope.event_type)
            .bind(&record.envelope.stream_key)
            .bind(record.envelope.timestamp_utc)
            .bind(i64::from(record.envelope.schema_version))
            .bind(&record.envelope.payload)
            .bind(received_utc)
            .bind(now)
            .bind(&record.trace_id)
            .bind(&record.idempotency_key)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        sqlx::query(UPSERT_STREAM_STATE_SQL)
            .bind(&record.envelope.tenant_id)
            .bind(&record.envelope.stream_key)
            .bind(record.envelope.timestamp_utc)
            .bind(&record.envelope.event_type)
            .bind(&record.envelope.payload)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        tx.commit().await.map_err(persistence)?;
        Ok(PersistOutcome::Processed)
    }

    async fn write_dead_letter(&self, entry: &DeadLetterEntry) -> Result<(), DomainError> {
        sqlx::query(INSERT_DEAD_LETTER_SQL)
            .bind(Uuid::new_v4())
            .bind(entry.tenant_id.as_deref())
            .bind(&entry.event_snapshot)
            .bind(&entry.reason)
            .bind(entry.created_utc)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }
}

fn persistence(error: sqlx::Error) -> DomainError {
    tracing::error!(%error, "hot store write failed");
    DomainError::Persistence(error.to_string())
}
