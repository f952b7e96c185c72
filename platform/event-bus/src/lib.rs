//! # EventBus Abstraction
//!
//! A platform-level abstraction for event-driven messaging between services.
//!
//! ## Why This Lives in `platform/`
//!
//! The EventBus is a **shared runtime capability** that both services depend
//! on. Placing it in `platform/` allows:
//! - Services to depend on platform crates without depending on each other
//! - Config-driven swap between NATS (production) and InMemory (dev/test)
//!
//! ## Delivery Contract
//!
//! The bus is a thin client over a durable log and inherits its guarantees:
//!
//! - **At-least-once delivery**: a successfully published envelope may still
//!   be observed more than once by a consumer. Handlers must be idempotent;
//!   the envelope's `eventId` is the dedup key.
//! - **Per-subject ordering only**: messages published to one subject by one
//!   producer arrive in publish order. There is no cross-subject ordering.
//! - **Acknowledged publish**: `publish` does not return until the send has
//!   been flushed to the broker. Callers that need resilience wrap it in
//!   [`retry::retry_with_backoff`].
//!
//! ## Session Lifecycle
//!
//! The transport session is **process-scoped state**: connect once in `main`
//! before serving traffic (an unreachable broker is fatal at startup), reuse
//! the handle everywhere, and call [`EventBus::disconnect`] on shutdown to
//! drain in-flight sends. There is no lazy connect on first publish.
//!
//! ## Implementations
//!
//! - **NatsBus**: production implementation over `async-nats`
//! - **InMemoryBus**: test/dev implementation over tokio broadcast channels
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{EventBus, NatsBus, InMemoryBus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Production: NATS (fails fast if the broker is unreachable)
//! let bus: Arc<dyn EventBus> = Arc::new(NatsBus::connect("nats://localhost:4222").await?);
//!
//! // Dev/Test: In-Memory
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//!
//! // Publish an event
//! let payload = serde_json::to_vec(&serde_json::json!({
//!     "eventType": "ORDER_CREATED",
//!     "payload": { "orderId": "o-123" }
//! }))?;
//! bus.publish("orders.events.order.created", payload).await?;
//!
//! // Subscribe to events
//! let mut stream = bus.subscribe("orders.events.>").await?;
//! while let Some(msg) = futures::StreamExt::next(&mut stream).await {
//!     println!("Received: {} bytes on {}", msg.payload.len(), msg.subject);
//! }
//!
//! // Shutdown: drain buffered sends, release the session
//! bus.disconnect().await?;
//! # Ok(())
//! # }
//! ```

mod envelope;
mod inmemory_bus;
mod nats_bus;
pub mod retry;

pub use envelope::{validate_envelope_fields, EventEnvelope, EventMetadata};
pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// A message received from the event bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject this message was published to
    pub subject: String,
    /// The message payload (raw bytes, JSON envelope by convention)
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Create a new bus message
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self { subject, payload }
    }
}

/// Errors that can occur when using the event bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("event bus already disconnected")]
    Disconnected,
}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core event bus abstraction for publish-subscribe messaging
///
/// The trait is object-safe so services can hold an `Arc<dyn EventBus>` and
/// swap implementations from configuration (`BUS_TYPE=nats|inmemory`).
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message to a subject.
    ///
    /// The call returns once the broker has acknowledged the send (flush).
    /// Delivery downstream remains at-least-once: consumers may observe the
    /// same message twice and must dedup on the envelope's `eventId`.
    ///
    /// # Arguments
    /// * `subject` - The subject to publish to (e.g. "orders.events.order.created")
    /// * `payload` - The message payload as raw bytes
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to messages matching a subject pattern.
    ///
    /// # Arguments
    /// * `subject` - The subject pattern to subscribe to (supports wildcards)
    ///   - `*` matches a single token (e.g. `orders.*.created`)
    ///   - `>` matches one or more tokens (e.g. `orders.events.>`)
    ///
    /// # Returns
    /// * `Ok(BoxStream)` containing a stream of messages
    /// * `Err(BusError)` if subscription failed — fatal when it happens at
    ///   startup, before the service begins serving traffic
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>>;

    /// Drain in-flight sends and release the session.
    ///
    /// Idempotent: the first call tears the session down, repeat calls are
    /// no-ops, and calling it on a bus that never carried traffic is safe.
    /// Publishing after disconnect fails with [`BusError::Disconnected`].
    async fn disconnect(&self) -> BusResult<()>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
