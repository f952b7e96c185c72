use crate::store::StoreError;
use event_bus::BusError;
use thiserror::Error;

/// Order service error taxonomy.
///
/// Command-path errors surface synchronously to the caller; the HTTP layer
/// maps them to status codes (validation/not-found → client error,
/// store/transport → service error). Handler-path errors never crash the
/// consuming process — the consumer retries and then quarantines.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed or out-of-range command input; rejected before any
    /// mutation or publish.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced order id absent; no mutation, no event.
    #[error("order {0} not found")]
    NotFound(String),

    /// Record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event publish failed after the bounded retry budget. Entity state is
    /// already persisted at this point; the downstream notification is lost
    /// and the caller is told so.
    #[error("event publish failed: {0}")]
    Transport(#[from] BusError),
}
