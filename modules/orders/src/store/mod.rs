//! Keyed record store for the orders service.
//!
//! The store is the only shared mutable state between the command path and
//! the event-handler path, which may run in separate processes. Everything
//! that must be race-free — the set-at-most-once `invoice_id`, and the
//! exactly-once INVOICE_SEND claim — is therefore expressed as an atomic
//! conditional update here, not as an in-process lock.
//!
//! Two implementations, selected by `STORE_TYPE` the same way `BUS_TYPE`
//! selects the bus: Postgres for production, in-memory for dev/test.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

use crate::config::Config;
use crate::models::{Order, OrderStatus, UpdateOrderRequest};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Record store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// An event that exhausted its retry budget (or fell outside the catalog)
/// and was quarantined instead of silently dropped.
#[derive(Debug, Clone)]
pub struct QuarantinedEvent {
    pub event_id: Uuid,
    pub subject: String,
    pub envelope: serde_json::Value,
    pub error: String,
    pub retry_count: i32,
}

/// Keyed record store owned by the orders service.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    async fn list(&self) -> Result<Vec<Order>, StoreError>;

    /// Apply a field patch. Ignores `status` — status changes go through
    /// [`OrderStore::set_status`] so their side effects stay in one place.
    async fn update_fields(
        &self,
        id: &str,
        patch: &UpdateOrderRequest,
    ) -> Result<Option<Order>, StoreError>;

    async fn set_status(&self, id: &str, status: OrderStatus)
        -> Result<Option<Order>, StoreError>;

    /// Attach an invoice id, set-at-most-once: a no-op when one is already
    /// present. Returns the current record (post-attach) or `None` when the
    /// order does not exist.
    async fn attach_invoice(
        &self,
        id: &str,
        invoice_id: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Atomic conditional update that decides which caller publishes
    /// INVOICE_SEND: flips `invoice_send_emitted` iff
    /// `status == SHIPPED && invoice_id set && !invoice_send_emitted`,
    /// and returns whether THIS call performed the flip. Both the
    /// status-update path and the INVOICE_UPLOADED handler funnel through
    /// this, so exactly one of them wins under any interleaving.
    async fn claim_invoice_send(&self, id: &str) -> Result<bool, StoreError>;

    /// Inbox: has this envelope already been handled?
    async fn is_event_processed(&self, event_id: Uuid) -> Result<bool, StoreError>;

    /// Inbox: record a handled envelope so redeliveries become no-ops.
    async fn mark_event_processed(
        &self,
        event_id: Uuid,
        event_type: &str,
        source: &str,
    ) -> Result<(), StoreError>;

    /// Dead-letter: keep a failed event around for inspection/replay.
    async fn quarantine_event(&self, event: QuarantinedEvent) -> Result<(), StoreError>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Build the configured store. Postgres mode connects and migrates before
/// the service starts serving traffic; failures here are fatal at startup.
pub async fn connect(config: &Config) -> Result<Arc<dyn OrderStore>, StoreError> {
    match config.store_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using in-memory order store");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
        "postgres" => {
            let url = config.database_url.as_deref().ok_or_else(|| {
                StoreError::Backend("DATABASE_URL must be set for STORE_TYPE=postgres".to_string())
            })?;

            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;

            tracing::info!("Running migrations...");
            sqlx::migrate!("./db/migrations")
                .run(&pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            Ok(Arc::new(PgOrderStore::new(pool)))
        }
        other => Err(StoreError::Backend(format!(
            "invalid STORE_TYPE: {other}. Must be 'inmemory' or 'postgres'"
        ))),
    }
}
