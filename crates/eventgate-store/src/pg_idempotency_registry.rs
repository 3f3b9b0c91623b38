//! PostgreSQL implementation of the `IdempotencyRegistry` trait.

use async_trait::async_trait;
use sqlx::PgPool;

use eventgate_core::error::DomainError;
use eventgate_core::registry::{IdempotencyRegistry, RegisterOutcome};

/// Single-statement merge for the registration attempt.
///
/// The no-op `DO UPDATE` makes the statement block on a concurrent insert of
/// the same key and return the surviving row; `xmax = 0` is true only for
/// the transaction that performed the insert. A try-insert-then-read
/// sequence would instead race against the winner's visibility.
const TRY_REGISTER_SQL: &str = r"
INSERT INTO idempotency_keys (tenant_id, idempotency_key, payload_hash, first_seen_utc)
VALUES ($1, $2, $3, NOW())
ON CONFLICT (tenant_id, idempotency_key)
DO UPDATE SET payload_hash = idempotency_keys.payload_hash
RETURNING payload_hash, (xmax = 0) AS inserted
";

const UNREGISTER_SQL: &str = r"
DELETE FROM idempotency_keys
WHERE tenant_id = $1 AND idempotency_key = $2
";

/// PostgreSQL-backed idempotency registry.
#[derive(Debug, Clone)]
pub struct PgIdempotencyRegistry {
    pool: PgPool,
}

impl PgIdempotencyRegistry {
    /// Creates a new `PgIdempotencyRegistry`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyRegistry for PgIdempotencyRegistry {
    async fn try_register(
        &self,
        tenant_id: &str,
        idempotency_key: &str,
        payload_hash: &str,
    ) -> Result<RegisterOutcome, DomainError> {
        let (stored_hash, inserted): (String, bool) = sqlx::query_as(TRY_REGISTER_SQL)
            .bind(tenant_id)
            .bind(idempotency_key)
            .bind(payload_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;

        if inserted {
            Ok(RegisterOutcome::Inserted)
        } else if stored_hash == payload_hash {
            Ok(RegisterOutcome::Duplicate)
        } else {
            Ok(RegisterOutcome::Conflict)
        }
    }

    async fn unregister(&self, tenant_id: &str, idempotency_key: &str) -> Result<(), DomainError> {
        sqlx::query(UNREGISTER_SQL)
            .bind(tenant_id)
            .bind(idempotency_key)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }
}

fn persistence(error: sqlx::Error) -> DomainError {
    tracing::error!(%error, "idempotency registry query failed");
    DomainError::Persistence(error.to_string())
}
