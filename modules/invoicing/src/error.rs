use crate::store::StoreError;
use event_bus::BusError;
use thiserror::Error;

/// Invoice service error taxonomy. Command-path errors surface
/// synchronously; handler-path errors are retried and quarantined by the
/// consumer, never allowed to crash the process.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Malformed command input (bad ids, empty/oversized/non-PDF file);
    /// rejected before any mutation or publish.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced invoice absent; no mutation, no event.
    #[error("invoice not found: {0}")]
    NotFound(String),

    /// Record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// PDF file storage failure.
    #[error("file storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// Event publish failed after the bounded retry budget; entity state is
    /// already persisted and the caller is told the notification was lost.
    #[error("event publish failed: {0}")]
    Transport(#[from] BusError),
}
