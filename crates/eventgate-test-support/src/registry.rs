//! Test registries — mock `IdempotencyRegistry` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use eventgate_core::error::DomainError;
use eventgate_core::registry::{IdempotencyRegistry, RegisterOutcome};

/// An in-memory registry with the real merge semantics: first registration
/// of a key wins, a matching hash is a duplicate, a differing hash is a
/// conflict. Records `unregister` calls.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    rows: Mutex<HashMap<(String, String), String>>,
    unregistered: Mutex<Vec<(String, String)>>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all `(tenantId, idempotencyKey)` pairs that
    /// were unregistered.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn unregistered(&self) -> Vec<(String, String)> {
        self.unregistered.lock().unwrap().clone()
    }

    /// True when the key is currently registered.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn contains(&self, tenant_id: &str, idempotency_key: &str) -> bool {
        self.rows
            .lock()
            .unwrap()
            .contains_key(&(tenant_id.to_owned(), idempotency_key.to_owned()))
    }
}

#[async_trait]
impl IdempotencyRegistry for InMemoryRegistry {
    async fn try_register(
        &self,
        tenant_id: &str,
        idempotency_key: &str,
        payload_hash: &str,
    ) -> Result<RegisterOutcome, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.entry((tenant_id.to_owned(), idempotency_key.to_owned())) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(payload_hash.to_owned());
                Ok(RegisterOutcome::Inserted)
            }
            std::collections::hash_map::Entry::Occupied(entry) => {
                if entry.get() == payload_hash {
                    Ok(RegisterOutcome::Duplicate)
                } else {
                    Ok(RegisterOutcome::Conflict)
                }
            }
        }
    }

    async fn unregister(&self, tenant_id: &str, idempotency_key: &str) -> Result<(), DomainError> {
        let key = (tenant_id.to_owned(), idempotency_key.to_owned());
        self.rows.lock().unwrap().remove(&key);
        self.unregistered.lock().unwrap().push(key);
        Ok(())
    }
}

/// A registry that always returns a persistence error. Useful for testing
/// infrastructure-failure paths.
#[derive(Debug)]
pub struct FailingRegistry;

#[async_trait]
impl IdempotencyRegistry for FailingRegistry {
    async fn try_register(
        &self,
        _tenant_id: &str,
        _idempotency_key: &str,
        _payload_hash: &str,
    ) -> Result<RegisterOutcome, DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }

    async fn unregister(
        &self,
        _tenant_id: &str,
        _idempotency_key: &str,
    ) -> Result<(), DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }
}
