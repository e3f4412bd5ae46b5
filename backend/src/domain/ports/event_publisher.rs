//! Port for emitting domain events to a stream.
use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by event stream adapters.
    pub enum EventPublishError {
        /// The stream transport could not be reached.
        Connection { message: String } => "event stream connection failed: {message}",
        /// The transport refused the record.
        Rejected { message: String } => "event stream rejected record: {message}",
    }
}

/// Best-effort publisher of opaque event payloads.
///
/// Every call is a separate record with a freshly generated partition key, so
/// repeated publishes are neither deduplicated nor ordered relative to each
/// other.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Append `payload` to the configured stream.
    async fn publish(&self, payload: &[u8]) -> Result<(), EventPublishError>;
}
