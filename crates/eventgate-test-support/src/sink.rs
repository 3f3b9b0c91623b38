//! Test sinks — mock `BroadcastSink` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use eventgate_core::broadcast::{BroadcastEvent, BroadcastSink};
use eventgate_core::error::DomainError;

/// A sink that records every pushed event, with a switchable failure mode.
#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<BroadcastEvent>>,
    fail: bool,
}

impl RecordingSink {
    /// Creates a sink that accepts every push.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that rejects every push.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            received: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Returns a snapshot of all events pushed to the sink.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn received(&self) -> Vec<BroadcastEvent> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastSink for RecordingSink {
    async fn publish(&self, event: &BroadcastEvent) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::Fanout("sink returned 500".into()));
        }
        self.received.lock().unwrap().push(event.clone());
        Ok(())
    }
}
