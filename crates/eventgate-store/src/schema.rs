//! Hot store database schema.
//!
//! Creation is idempotent and runs at component startup; the schema is the
//! contract between the processor and any read-side consumer.

use sqlx::PgPool;

/// SQL to create the idempotency registry table.
pub const CREATE_IDEMPOTENCY_KEYS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS idempotency_keys (
    tenant_id       TEXT NOT NULL,
    idempotency_key TEXT NOT NULL,
    payload_hash    TEXT NOT NULL,
    first_seen_utc  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (tenant_id, idempotency_key)
);
";

/// SQL to create the events table and its read-side indexes.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    event_id        UUID PRIMARY KEY,
    tenant_id       TEXT NOT NULL,
    source          TEXT NOT NULL,
    event_type      TEXT NOT NULL,
    stream_key      TEXT NOT NULL,
    timestamp_utc   TIMESTAMPTZ NOT NULL,
    schema_version  BIGINT NOT NULL,
    payload         JSONB NOT NULL,
    received_utc    TIMESTAMPTZ NOT NULL,
    processed_utc   TIMESTAMPTZ NOT NULL,
    trace_id        TEXT NOT NULL,
    idempotency_key TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_tenant_time
    ON events (tenant_id, timestamp_utc DESC);

CREATE INDEX IF NOT EXISTS idx_events_tenant_source_time
    ON events (tenant_id, source, timestamp_utc DESC);

CREATE INDEX IF NOT EXISTS idx_events_tenant_type_time
    ON events (tenant_id, event_type, timestamp_utc DESC);

CREATE INDEX IF NOT EXISTS idx_events_tenant_stream_time
    ON events (tenant_id, stream_key, timestamp_utc DESC);
";

/// SQL to create the worker-side dedup barrier.
pub const CREATE_PROCESSED_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS processed_events (
    event_id        UUID PRIMARY KEY,
    tenant_id       TEXT NOT NULL,
    idempotency_key TEXT NOT NULL,
    processed_utc   TIMESTAMPTZ NOT NULL,
    UNIQUE (tenant_id, idempotency_key)
);
";

/// SQL to create the per-stream latest-view table.
pub const CREATE_STREAM_STATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS stream_state (
    tenant_id     TEXT NOT NULL,
    stream_key    TEXT NOT NULL,
    last_seen_utc TIMESTAMPTZ NOT NULL,
    last_type     TEXT NOT NULL,
    last_payload  JSONB NOT NULL,
    PRIMARY KEY (tenant_id, stream_key)
);
";

/// SQL to create the dead-letter table.
pub const CREATE_DEAD_LETTER_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS dead_letter (
    id             UUID PRIMARY KEY,
    tenant_id      TEXT,
    event_snapshot JSONB NOT NULL,
    reason         VARCHAR(500) NOT NULL,
    created_utc    TIMESTAMPTZ NOT NULL
);
";

/// Creates every table and index if absent.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statements in [
        CREATE_IDEMPOTENCY_KEYS_TABLE,
        CREATE_EVENTS_TABLE,
        CREATE_PROCESSED_EVENTS_TABLE,
        CREATE_STREAM_STATE_TABLE,
        CREATE_DEAD_LETTER_TABLE,
    ] {
        sqlx::raw_sql(statements).execute(pool).await?;
    }
    Ok(())
}
