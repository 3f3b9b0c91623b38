//! Shared application state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use eventgate_core::clock::Clock;
use eventgate_core::publish::EventPublisher;
use eventgate_core::registry::IdempotencyRegistry;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock used to stamp `receivedAtUtc`.
    pub clock: Arc<dyn Clock>,
    /// Durable dedup of ingestion attempts.
    pub registry: Arc<dyn IdempotencyRegistry>,
    /// Log producer for accepted envelopes.
    pub publisher: Arc<dyn EventPublisher>,
    /// Render handle for the metrics route.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        registry: Arc<dyn IdempotencyRegistry>,
        publisher: Arc<dyn EventPublisher>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            clock,
            registry,
            publisher,
            metrics,
        }
    }
}
