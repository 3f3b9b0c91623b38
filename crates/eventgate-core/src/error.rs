//! Error taxonomy shared across the pipeline.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Structural or semantic validation failure.
    #[error("validation error: {0}")]
    Validation(String),

    /// An idempotency key was reused with a different payload.
    #[error("idempotency key was reused with a different payload")]
    IdempotencyConflict,

    /// The log publish did not durably enqueue the record.
    #[error("publish error: {0}")]
    Publish(String),

    /// A database read or write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The broadcast sink rejected or never received a fan-out.
    #[error("fan-out error: {0}")]
    Fanout(String),
}
