//! Log publisher abstraction used by the ingress endpoint.

use async_trait::async_trait;

use crate::envelope::InflightEvent;
use crate::error::DomainError;

/// Producer handle for the raw events topic.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueues the record on the log, keyed by `tenantId|streamKey`.
    /// Returning `Ok` implies the broker durably acknowledged the write.
    async fn publish(&self, record: &InflightEvent) -> Result<(), DomainError>;
}
