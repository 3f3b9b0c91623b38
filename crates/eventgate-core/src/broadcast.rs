//! Live-broadcast sink abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::InflightEvent;
use crate::error::DomainError;

/// Projection of a processed event pushed to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEvent {
    /// Event identifier as persisted.
    pub event_id: String,
    /// Tenant the event belongs to.
    pub tenant_id: String,
    /// Producing system.
    pub source: String,
    /// Event type name.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Client-stamped UTC instant of the event.
    pub timestamp_utc: DateTime<Utc>,
    /// Stream the event belongs to.
    pub stream_key: String,
    /// When the gateway accepted the event.
    pub received_at_utc: DateTime<Utc>,
    /// When the processor persisted the event.
    pub processed_at_utc: DateTime<Utc>,
    /// Trace id carried through the pipeline.
    pub trace_id: String,
}

impl BroadcastEvent {
    /// Projects an inflight record that was just persisted.
    #[must_use]
    pub fn project(
        record: &InflightEvent,
        received_at_utc: DateTime<Utc>,
        processed_at_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: record.envelope.event_id.clone(),
            tenant_id: record.envelope.tenant_id.clone(),
            source: record.envelope.source.clone(),
            event_type: record.envelope.event_type.clone(),
            timestamp_utc: record.envelope.timestamp_utc,
            stream_key: record.envelope.stream_key.clone(),
            received_at_utc,
            processed_at_utc,
            trace_id: record.trace_id.clone(),
        }
    }
}

/// Push channel towards the live-broadcast hub.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    /// Pushes one processed event to live subscribers.
    async fn publish(&self, event: &BroadcastEvent) -> Result<(), DomainError>;
}
