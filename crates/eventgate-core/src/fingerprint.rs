//! Canonical JSON fingerprinting of envelopes.
//!
//! The fingerprint distinguishes a safe retry (same key, same body) from
//! key misuse (same key, different body), so the encoding must be stable
//! across semantically equal inputs.

use sha2::{Digest, Sha256};

use crate::envelope::EventEnvelope;
use crate::error::DomainError;

/// Canonical JSON encoding of an envelope.
///
/// Re-encoding through a `serde_json::Value` yields objects with keys in
/// sorted order at every depth (`serde_json` maps are BTree-backed), so two
/// envelopes that differ only in payload key order encode identically.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the envelope cannot be encoded.
pub fn canonical_json(envelope: &EventEnvelope) -> Result<String, DomainError> {
    let value = serde_json::to_value(envelope)
        .map_err(|e| DomainError::Validation(format!("envelope is not encodable: {e}")))?;
    serde_json::to_string(&value)
        .map_err(|e| DomainError::Validation(format!("envelope is not encodable: {e}")))
}

/// Lowercase-hex SHA-256 digest of the canonical envelope encoding.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the envelope cannot be encoded.
pub fn payload_hash(envelope: &EventEnvelope) -> Result<String, DomainError> {
    let canonical = canonical_json(envelope)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn envelope_with_payload(payload: serde_json::Value) -> EventEnvelope {
        EventEnvelope {
            event_id: "8f86a6a7-18a1-4463-8578-16eb2cca2727".to_owned(),
            tenant_id: "contoso".to_owned(),
            source: "orders-api".to_owned(),
            event_type: "OrderCreated".to_owned(),
            timestamp_utc: Utc.with_ymd_and_hms(2026, 2, 26, 14, 22, 31).unwrap(),
            schema_version: 1,
            stream_key: "order-184922".to_owned(),
            payload,
        }
    }

    #[test]
    fn test_payload_hash_is_lowercase_hex_sha256() {
        let hash = payload_hash(&envelope_with_payload(serde_json::json!({"a": 1}))).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_payload_hash_ignores_payload_key_order() {
        let first: serde_json::Value =
            serde_json::from_str(r#"{"amount": 83.12, "orderId": "184922"}"#).unwrap();
        let second: serde_json::Value =
            serde_json::from_str(r#"{"orderId": "184922", "amount": 83.12}"#).unwrap();

        assert_eq!(
            payload_hash(&envelope_with_payload(first)).unwrap(),
            payload_hash(&envelope_with_payload(second)).unwrap(),
        );
    }

    #[test]
    fn test_payload_hash_differs_for_different_payloads() {
        let first = payload_hash(&envelope_with_payload(serde_json::json!({"amount": 83.12})));
        let second = payload_hash(&envelope_with_payload(serde_json::json!({"amount": 99.99})));
        assert_ne!(first.unwrap(), second.unwrap());
    }

    #[test]
    fn test_canonical_json_sorts_envelope_keys() {
        let canonical = canonical_json(&envelope_with_payload(serde_json::json!([1, 2]))).unwrap();
        let event_id_at = canonical.find("\"eventId\"").unwrap();
        let tenant_id_at = canonical.find("\"tenantId\"").unwrap();
        let payload_at = canonical.find("\"payload\"").unwrap();
        assert!(event_id_at < payload_at);
        assert!(payload_at < tenant_id_at);
    }
}
