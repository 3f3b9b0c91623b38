//! Event envelope and inflight record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Maximum byte length for `eventId` and `tenantId`.
pub const MAX_ID_LEN: usize = 128;
/// Maximum byte length for the remaining identifier fields.
pub const MAX_FIELD_LEN: usize = 256;

/// Client-supplied JSON record describing one event.
///
/// `eventId` is carried as text here: the gateway only checks presence and
/// length, and the processor enforces UUID parsing before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Client-supplied event identifier.
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
    /// Payload schema version; must be positive.
    pub schema_version: u32,
    /// Stream the event belongs to within the tenant.
    pub stream_key: String,
    /// Arbitrary JSON payload, preserved verbatim.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Checks the structural rules the gateway enforces: required fields
    /// non-empty and within their byte-length caps, positive schema version.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("eventId", &self.event_id, MAX_ID_LEN)?;
        require_text("tenantId", &self.tenant_id, MAX_ID_LEN)?;
        require_text("source", &self.source, MAX_FIELD_LEN)?;
        require_text("type", &self.event_type, MAX_FIELD_LEN)?;
        require_text("streamKey", &self.stream_key, MAX_FIELD_LEN)?;
        if self.schema_version == 0 {
            return Err(DomainError::Validation(
                "schemaVersion must be a positive integer".to_owned(),
            ));
        }
        Ok(())
    }
}

fn require_text(name: &str, value: &str, max_len: usize) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{name} must not be empty")));
    }
    if value.len() > max_len {
        return Err(DomainError::Validation(format!(
            "{name} must be at most {max_len} bytes"
        )));
    }
    Ok(())
}

/// Record published to the log: the envelope plus ingestion metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InflightEvent {
    /// The accepted envelope, flattened into the wire record.
    #[serde(flatten)]
    pub envelope: EventEnvelope,
    /// The caller's idempotency key.
    pub idempotency_key: String,
    /// Lowercase-hex SHA-256 fingerprint of the canonical envelope.
    pub payload_hash: String,
    /// When the gateway accepted the envelope; stamped just before publish.
    #[serde(default)]
    pub received_at_utc: Option<DateTime<Utc>>,
    /// Trace id carried in-band for downstream correlation.
    pub trace_id: String,
}

impl InflightEvent {
    /// The log partition key. Events sharing it are ordered end-to-end.
    #[must_use]
    pub fn partition_key(&self) -> String {
        format!("{}|{}", self.envelope.tenant_id, self.envelope.stream_key)
    }
}
