//! Hot-store abstraction consumed by the processing engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::envelope::InflightEvent;
use crate::error::DomainError;

/// Maximum byte length of a dead-letter reason.
pub const MAX_REASON_LEN: usize = 500;

/// Outcome of the persist transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The event row, processed marker, and stream state were written.
    Processed,
    /// The event was already processed; nothing was written.
    Duplicate,
}

/// A message that could not be processed, ready for the dead-letter table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterEntry {
    /// Tenant the message claimed, when one could be read.
    pub tenant_id: Option<String>,
    /// Normalized snapshot of the raw input.
    pub event_snapshot: serde_json::Value,
    /// Failure reason, truncated to `MAX_REASON_LEN` bytes.
    pub reason: String,
    /// When the entry was created.
    pub created_utc: DateTime<Utc>,
}

impl DeadLetterEntry {
    /// Builds an entry from the raw message text, normalizing the snapshot
    /// and truncating the reason on a char boundary.
    #[must_use]
    pub fn from_raw(
        raw: &str,
        tenant_id: Option<String>,
        reason: &str,
        created_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            event_snapshot: normalize_snapshot(raw),
            reason: truncate_reason(reason),
            created_utc,
        }
    }
}

/// Stores the raw text verbatim when it parses as a JSON object or array,
/// otherwise wraps it as `{"raw": "<text>"}`.
#[must_use]
pub fn normalize_snapshot(raw: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) if value.is_object() || value.is_array() => value,
        _ => serde_json::json!({ "raw": raw }),
    }
}

/// Truncates `reason` to at most `MAX_REASON_LEN` bytes without splitting a
/// codepoint.
#[must_use]
pub fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_REASON_LEN {
        return reason.to_owned();
    }
    let mut end = MAX_REASON_LEN;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_owned()
}

/// Transactional writes that take a log record to a durable terminal state.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Runs the persist transaction: dedup marker, event row, stream state.
    /// All three writes commit or roll back together. `now` becomes
    /// `processedUtc`, and stands in for a missing `receivedAtUtc`.
    async fn persist(
        &self,
        record: &InflightEvent,
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome, DomainError>;

    /// Appends a dead-letter row.
    async fn write_dead_letter(&self, entry: &DeadLetterEntry) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_snapshot_keeps_json_object_verbatim() {
        let snapshot = normalize_snapshot(r#"{"eventId": "abc", "n": 1}"#);
        assert_eq!(snapshot, serde_json::json!({"eventId": "abc", "n": 1}));
    }

    #[test]
    fn test_normalize_snapshot_keeps_json_array_verbatim() {
        let snapshot = normalize_snapshot("[1, 2, 3]");
        assert_eq!(snapshot, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_normalize_snapshot_wraps_non_json_text() {
        let snapshot = normalize_snapshot("not json at all");
        assert_eq!(snapshot, serde_json::json!({"raw": "not json at all"}));
    }

    #[test]
    fn test_normalize_snapshot_wraps_json_scalars() {
        let snapshot = normalize_snapshot("42");
        assert_eq!(snapshot, serde_json::json!({"raw": "42"}));
    }

    #[test]
    fn test_truncate_reason_keeps_short_reasons() {
        assert_eq!(truncate_reason("boom"), "boom");
    }

    #[test]
    fn test_truncate_reason_caps_at_500_bytes() {
        let reason = "x".repeat(600);
        let truncated = truncate_reason(&reason);
        assert_eq!(truncated.len(), MAX_REASON_LEN);
    }

    #[test]
    fn test_truncate_reason_respects_char_boundaries() {
        // 'é' is two bytes; 250 of them put a boundary exactly at 500, one
        // more shifts the boundary inside a codepoint.
        let reason = "é".repeat(251);
        let truncated = truncate_reason(&reason);
        assert!(truncated.len() <= MAX_REASON_LEN);
        assert_eq!(truncated, "é".repeat(250));
    }

    #[test]
    fn test_from_raw_combines_normalization_and_truncation() {
        let created = chrono::Utc::now();
        let entry = DeadLetterEntry::from_raw(
            "oops",
            Some("contoso".to_owned()),
            &"r".repeat(501),
            created,
        );
        assert_eq!(entry.tenant_id.as_deref(), Some("contoso"));
        assert_eq!(entry.event_snapshot, serde_json::json!({"raw": "oops"}));
        assert_eq!(entry.reason.len(), MAX_REASON_LEN);
        assert_eq!(entry.created_utc, created);
    }
}
