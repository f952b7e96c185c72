//! NATS-based implementation of the EventBus trait

use crate::{BusError, BusMessage, BusResult, EventBus};
use async_nats::Client;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// EventBus implementation backed by a NATS server.
///
/// This is the production implementation. The session is established once by
/// [`NatsBus::connect`] — before the service starts serving traffic — and an
/// unreachable broker surfaces as a hard error there, never as a silent
/// degrade on first publish.
///
/// # Example
/// ```rust,no_run
/// use event_bus::{EventBus, NatsBus};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = NatsBus::connect("nats://localhost:4222").await?;
///
/// bus.publish("orders.events.order.created", b"{}".to_vec()).await?;
/// bus.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NatsBus {
    client: Client,
    closed: Arc<AtomicBool>,
}

impl NatsBus {
    /// Connect to a NATS server and establish the process-wide session.
    ///
    /// # Errors
    /// Returns [`BusError::ConnectionError`] when the broker is unreachable.
    /// Callers treat this as fatal at startup.
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::ConnectionError(e.to_string()))?;

        tracing::info!(url = %url, "Connected to NATS");
        Ok(Self::new(client))
    }

    /// Wrap an already-connected NATS client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a reference to the underlying NATS client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Disconnected);
        }

        self.client
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        // Acknowledged publish: flush so the send has reached the broker
        // before we report success. A buffered-but-unsent message is exactly
        // the silent-loss mode this rules out.
        self.client
            .flush()
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let stream = subscriber
            .map(|nats_msg| BusMessage::new(nats_msg.subject.to_string(), nats_msg.payload.to_vec()));

        Ok(stream.boxed())
    }

    async fn disconnect(&self) -> BusResult<()> {
        // First caller drains; repeat calls are no-ops.
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.client
            .flush()
            .await
            .map_err(|e| BusError::ConnectionError(e.to_string()))?;

        tracing::info!("NATS session drained and released");
        Ok(())
    }
}
