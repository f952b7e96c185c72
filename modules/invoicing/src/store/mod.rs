//! Keyed record store for the invoicing service.
//!
//! The unset→set transition of `sent_at` is the one write that must be
//! race-free under redelivery, so it is expressed as an atomic conditional
//! update (`mark_sent`) rather than a read-modify-write in the service.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryInvoiceStore;
pub use postgres::PgInvoiceStore;

use crate::config::Config;
use crate::models::Invoice;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
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

/// Keyed record store owned by the invoicing service.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert(&self, invoice: Invoice) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError>;

    /// Unique secondary lookup by order id.
    async fn get_by_order(&self, order_id: &str) -> Result<Option<Invoice>, StoreError>;

    /// Atomic conditional update: set `sent_at` iff currently unset.
    /// Returns whether THIS call performed the unset→set transition — the
    /// caller publishes INVOICE_SENT exactly when it did.
    async fn mark_sent(&self, id: &str, sent_at: DateTime<Utc>) -> Result<bool, StoreError>;

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
pub async fn connect(config: &Config) -> Result<Arc<dyn InvoiceStore>, StoreError> {
    match config.store_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using in-memory invoice store");
            Ok(Arc::new(InMemoryInvoiceStore::new()))
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

            Ok(Arc::new(PgInvoiceStore::new(pool)))
        }
        other => Err(StoreError::Backend(format!(
            "invalid STORE_TYPE: {other}. Must be 'inmemory' or 'postgres'"
        ))),
    }
}
