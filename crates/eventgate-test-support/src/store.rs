//! Test stores — mock `EventStore` implementations for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventgate_core::envelope::InflightEvent;
use eventgate_core::error::DomainError;
use eventgate_core::store::{DeadLetterEntry, EventStore, PersistOutcome};

/// An in-memory store that mirrors the real dedup barrier: the first persist
/// of an `eventId` succeeds, repeats report `Duplicate`. Records persisted
/// events and dead-letter entries, with switchable failure modes.
#[derive(Debug, Default)]
pub struct RecordingStore {
    persisted: Mutex<Vec<(InflightEvent, DateTime<Utc>)>>,
    seen_event_ids: Mutex<HashSet<String>>,
    dead_letters: Mutex<Vec<DeadLetterEntry>>,
    fail_persist: bool,
    fail_dead_letter: bool,
}

impl RecordingStore {
    /// Creates an empty store that succeeds on every write.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose persist transaction always fails.
    #[must_use]
    pub fn failing_persist() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }

    /// Creates a store whose persist and dead-letter writes both fail.
    #[must_use]
    pub fn failing_dead_letter() -> Self {
        Self {
            fail_persist: true,
            fail_dead_letter: true,
            ..Self::default()
        }
    }

    /// Returns a snapshot of all persisted records with their `now` stamp.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn persisted(&self) -> Vec<(InflightEvent, DateTime<Utc>)> {
        self.persisted.lock().unwrap().clone()
    }

    /// Returns a snapshot of all dead-letter entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetterEntry> {
        self.dead_letters.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingStore {
    async fn persist(
        &self,
        record: &InflightEvent,
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome, DomainError> {
        if self.fail_persist {
            return Err(DomainError::Persistence("connection refused".into()));
        }
        if !self
            .seen_event_ids
            .lock()
            .unwrap()
            .insert(record.envelope.event_id.clone())
        {
            return Ok(PersistOutcome::Duplicate);
        }
        self.persisted.lock().unwrap().push((record.clone(), now));
        Ok(PersistOutcome::Processed)
    }

    async fn write_dead_letter(&self, entry: &DeadLetterEntry) -> Result<(), DomainError> {
        if self.fail_dead_letter {
            return Err(DomainError::Persistence("connection refused".into()));
        }
        self.dead_letters.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// A store that always returns a persistence error from every operation.
#[derive(Debug)]
pub struct FailingStore;

#[async_trait]
impl EventStore for FailingStore {
    async fn persist(
        &self,
        _record: &InflightEvent,
        _now: DateTime<Utc>,
    ) -> Result<PersistOutcome, DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }

    async fn write_dead_letter(&self, _entry: &DeadLetterEntry) -> Result<(), DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }
}
