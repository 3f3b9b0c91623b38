//! Idempotency registry abstraction.

use async_trait::async_trait;

use crate::error::DomainError;

/// Outcome of an idempotency registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// This call inserted the row; the caller owns the publish.
    Inserted,
    /// The key exists with the same payload hash; safe retry.
    Duplicate,
    /// The key exists with a different payload hash; caller misuse.
    Conflict,
}

/// Durable dedup of ingestion attempts keyed by `(tenantId, idempotencyKey)`.
#[async_trait]
pub trait IdempotencyRegistry: Send + Sync {
    /// Atomically registers the key and returns a consistent outcome under
    /// concurrent duplicates: at most one caller ever observes `Inserted`,
    /// and losers observe the winner's stored hash.
    async fn try_register(
        &self,
        tenant_id: &str,
        idempotency_key: &str,
        payload_hash: &str,
    ) -> Result<RegisterOutcome, DomainError>;

    /// Removes a previously registered key. Best-effort compensation after a
    /// failed publish; a leftover row is recoverable because a retry with
    /// the same body observes a matching hash.
    async fn unregister(&self, tenant_id: &str, idempotency_key: &str) -> Result<(), DomainError>;
}
