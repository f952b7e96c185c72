//! Invoice aggregate: upload/lookup commands plus the INVOICE_SEND handler.
//!
//! Persist first, publish second. The INVOICE_SEND handler is idempotent
//! under redelivery: only the call that performs the unset→set transition
//! of `sent_at` publishes INVOICE_SENT.

use crate::error::InvoiceError;
use crate::events::publisher;
use crate::models::{Invoice, UploadInvoiceRequest};
use crate::storage;
use crate::store::{InvoiceStore, StoreError};
use crate::validation;
use chrono::Utc;
use event_bus::retry::RetryConfig;
use event_bus::EventBus;
use platform_contracts::{EventType, InvoiceSentPayload, InvoiceUploadedPayload};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub struct InvoiceService {
    store: Arc<dyn InvoiceStore>,
    bus: Arc<dyn EventBus>,
    upload_root: PathBuf,
    retry: RetryConfig,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn InvoiceStore>, bus: Arc<dyn EventBus>, upload_root: PathBuf) -> Self {
        Self {
            store,
            bus,
            upload_root,
            retry: RetryConfig::default(),
        }
    }

    /// The store handle, shared with the event consumer (inbox/quarantine)
    /// and with tests that assert on persisted state.
    pub fn store(&self) -> Arc<dyn InvoiceStore> {
        self.store.clone()
    }

    /// Upload an invoice PDF and publish INVOICE_UPLOADED.
    ///
    /// The file is written and the record persisted before the event goes
    /// out; a consumer reacting to INVOICE_UPLOADED can always read the
    /// invoice back.
    pub async fn upload(
        &self,
        req: UploadInvoiceRequest,
        file: Vec<u8>,
        filename: &str,
    ) -> Result<Invoice, InvoiceError> {
        validation::validate_upload(&req, &file)?;

        // One invoice per order: check up front so the common duplicate is a
        // clean rejection before the file lands on disk. The unique index
        // backstops the remaining race.
        if self.store.get_by_order(&req.order_id).await?.is_some() {
            return Err(InvoiceError::Validation(format!(
                "an invoice is already uploaded for order {}",
                req.order_id
            )));
        }

        let pdf_path = storage::store_invoice_pdf(
            &self.upload_root,
            &req.seller_id,
            &req.order_id,
            filename,
            &file,
        )
        .await?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            order_id: req.order_id,
            seller_id: req.seller_id,
            pdf_path,
            uploaded_at: Utc::now(),
            sent_at: None,
        };

        self.store.insert(invoice.clone()).await?;

        publisher::publish_event(
            self.bus.as_ref(),
            &self.retry,
            EventType::InvoiceUploaded,
            InvoiceUploadedPayload {
                invoice_id: invoice.id.clone(),
                order_id: invoice.order_id.clone(),
            },
            Some(invoice.order_id.clone()),
        )
        .await?;

        tracing::info!(invoice_id = %invoice.id, order_id = %invoice.order_id, "Invoice uploaded");
        Ok(invoice)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Invoice, InvoiceError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| InvoiceError::NotFound(format!("invoice {id}")))
    }

    pub async fn get_by_order_id(&self, order_id: &str) -> Result<Invoice, InvoiceError> {
        self.store
            .get_by_order(order_id)
            .await?
            .ok_or_else(|| InvoiceError::NotFound(format!("invoice for order {order_id}")))
    }

    /// INVOICE_SEND handler. Redelivery-safe: a second delivery finds
    /// `sent_at` already set and succeeds as a no-op without re-publishing.
    pub async fn on_invoice_send(
        &self,
        invoice_id: &str,
        order_id: &str,
    ) -> Result<(), InvoiceError> {
        let invoice = self
            .store
            .get(invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::NotFound(format!("invoice {invoice_id}")))?;

        if invoice.sent_at.is_some() {
            tracing::info!(
                invoice_id = %invoice_id,
                "Invoice already sent; duplicate INVOICE_SEND ignored"
            );
            return Ok(());
        }

        let sent_at = Utc::now();
        if !self.store.mark_sent(invoice_id, sent_at).await? {
            // A concurrent delivery won the transition; it also publishes.
            tracing::info!(
                invoice_id = %invoice_id,
                "Invoice sent by a concurrent delivery; nothing to do"
            );
            return Ok(());
        }

        publisher::publish_event(
            self.bus.as_ref(),
            &self.retry,
            EventType::InvoiceSent,
            InvoiceSentPayload {
                invoice_id: invoice_id.to_string(),
                order_id: order_id.to_string(),
                sent_at,
            },
            Some(order_id.to_string()),
        )
        .await?;

        tracing::info!(invoice_id = %invoice_id, order_id = %order_id, "INVOICE_SENT published");
        Ok(())
    }

    /// Store connectivity, for the health endpoint.
    pub async fn store_healthy(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}
