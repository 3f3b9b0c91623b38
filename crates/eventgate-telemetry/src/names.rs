//! Metric names shared by the gateway and the processor.

/// Counter of terminal ingestion outcomes, labelled by HTTP status.
pub const GATEWAY_REQUESTS_TOTAL: &str = "gateway_requests_total";

/// Histogram of ingestion request duration in milliseconds.
pub const GATEWAY_REQUEST_DURATION_MS: &str = "gateway_request_duration_ms";

/// Counter of terminal per-message outcomes, labelled by result.
pub const PROCESSOR_EVENTS_TOTAL: &str = "processor_events_total";

/// Counter of dead-lettered messages.
pub const DLQ_EVENTS_TOTAL: &str = "dlq_events_total";

/// Gauge of `now - timestampUtc` at the last successful persist.
pub const PROCESSOR_LAG_SECONDS: &str = "processor_lag_seconds";

/// Histogram of `now - receivedAtUtc` at the last successful persist.
pub const END_TO_END_FRESHNESS_SECONDS: &str = "end_to_end_freshness_seconds";
