//! Postgres-backed invoice store. The sent-at transition is a single
//! conditional UPDATE, so the at-most-once guarantee holds across
//! processes.

use super::{InvoiceStore, QuarantinedEvent, StoreError};
use crate::models::Invoice;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres implementation of [`InvoiceStore`]
pub struct PgInvoiceStore {
    pool: PgPool,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    order_id: String,
    seller_id: String,
    pdf_path: String,
    uploaded_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            order_id: row.order_id,
            seller_id: row.seller_id,
            pdf_path: row.pdf_path,
            uploaded_at: row.uploaded_at,
            sent_at: row.sent_at,
        }
    }
}

const INVOICE_COLUMNS: &str = "id, order_id, seller_id, pdf_path, uploaded_at, sent_at";

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    async fn insert(&self, invoice: Invoice) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (id, order_id, seller_id, pdf_path, uploaded_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.order_id)
        .bind(&invoice.seller_id)
        .bind(&invoice.pdf_path)
        .bind(invoice.uploaded_at)
        .bind(invoice.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Invoice::from))
    }

    async fn get_by_order(&self, order_id: &str) -> Result<Option<Invoice>, StoreError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Invoice::from))
    }

    async fn mark_sent(&self, id: &str, sent_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE invoices SET sent_at = $2 WHERE id = $1 AND sent_at IS NULL")
                .bind(id)
                .bind(sent_at)
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
