//! Test publishers — mock `EventPublisher` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use eventgate_core::envelope::InflightEvent;
use eventgate_core::error::DomainError;
use eventgate_core::publish::EventPublisher;

/// A publisher that records every published record and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<InflightEvent>>,
}

impl RecordingPublisher {
    /// Creates an empty recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all records that were published.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<InflightEvent> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, record: &InflightEvent) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// A publisher that always fails, as if the broker never acknowledged.
#[derive(Debug)]
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _record: &InflightEvent) -> Result<(), DomainError> {
        Err(DomainError::Publish("broker unavailable".into()))
    }
}
