//! Postgres-backed order store.
//!
//! The INVOICE_SEND claim and the set-at-most-once invoice attach are single
//! conditional UPDATE statements — the row is the serialization point, so
//! the guarantees hold across processes, not just tasks.

use super::{OrderStore, QuarantinedEvent, StoreError};
use crate::models::{Order, OrderStatus, UpdateOrderRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres implementation of [`OrderStore`]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    status: String,
    price: f64,
    quantity: i32,
    product_id: String,
    customer_id: String,
    seller_id: String,
    invoice_id: Option<String>,
    invoice_send_emitted: bool,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, StoreError> {
        let status = OrderStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Backend(format!("invalid status in store: {}", self.status))
        })?;
        Ok(Order {
            id: self.id,
            status,
            price: self.price,
            quantity: self.quantity,
            product_id: self.product_id,
            customer_id: self.customer_id,
            seller_id: self.seller_id,
            invoice_id: self.invoice_id,
            invoice_send_emitted: self.invoice_send_emitted,
            created_at: self.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, status, price, quantity, product_id, customer_id, seller_id, \
                             invoice_id, invoice_send_emitted, created_at";

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, status, price, quantity, product_id, customer_id, seller_id,
                 invoice_id, invoice_send_emitted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&order.id)
        .bind(order.status.as_str())
        .bind(order.price)
        .bind(order.quantity)
        .bind(&order.product_id)
        .bind(&order.customer_id)
        .bind(&order.seller_id)
        .bind(&order.invoice_id)
        .bind(order.invoice_send_emitted)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn update_fields(
        &self,
        id: &str,
        patch: &UpdateOrderRequest,
    ) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE orders SET
                price       = COALESCE($2, price),
                quantity    = COALESCE($3, quantity),
                product_id  = COALESCE($4, product_id),
                customer_id = COALESCE($5, customer_id),
                seller_id   = COALESCE($6, seller_id)
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.price)
        .bind(patch.quantity.map(|q| q as i32))
        .bind(&patch.product_id)
        .bind(&patch.customer_id)
        .bind(&patch.seller_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn set_status(
        &self,
        id: &str,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn attach_invoice(
        &self,
        id: &str,
        invoice_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        // Set-at-most-once: the conditional write only lands when no invoice
        // is attached yet; the follow-up read returns the current record
        // either way.
        sqlx::query("UPDATE orders SET invoice_id = $2 WHERE id = $1 AND invoice_id IS NULL")
            .bind(id)
            .bind(invoice_id)
            .execute(&self.pool)
            .await?;

        self.get(id).await
    }

    async fn claim_invoice_send(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET invoice_send_emitted = TRUE
            WHERE id = $1
              AND status = 'SHIPPED'
              AND invoice_id IS NOT NULL
              AND invoice_send_emitted = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_event_processed(&self, event_id: Uuid) -> Result<bool, StoreError> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT event_id FROM processed_events WHERE event_id = $1")
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    async fn mark_event_processed(
        &self,
        event_id: Uuid,
        event_type: &str,
        source: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO processed_events (event_id, event_type, source_module)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .bind(source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn quarantine_event(&self, event: QuarantinedEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO failed_events (event_id, subject, envelope_json, error, retry_count)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO UPDATE
            SET retry_count = EXCLUDED.retry_count,
                error = EXCLUDED.error,
                failed_at = NOW()
            "#,
        )
        .bind(event.event_id)
        .bind(&event.subject)
        .bind(&event.envelope)
        .bind(&event.error)
        .bind(event.retry_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
