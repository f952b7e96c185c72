//! In-memory invoice store for dev/test. One mutex guards the whole state,
//! so `mark_sent` is atomic exactly like its Postgres counterpart.

use super::{InvoiceStore, QuarantinedEvent, StoreError};
use crate::models::Invoice;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemState {
    invoices: HashMap<String, Invoice>,
    processed: HashSet<Uuid>,
    quarantined: Vec<QuarantinedEvent>,
}

/// In-memory implementation of [`InvoiceStore`]
#[derive(Default)]
pub struct InMemoryInvoiceStore {
    state: Mutex<MemState>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        self.state.lock().expect("invoice store mutex poisoned")
    }

    /// Quarantined events, for test assertions
    pub fn quarantined(&self) -> Vec<QuarantinedEvent> {
        self.lock().quarantined.clone()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn insert(&self, invoice: Invoice) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state
            .invoices
            .values()
            .any(|i| i.order_id == invoice.order_id)
        {
            return Err(StoreError::Backend(format!(
                "invoice already exists for order {}",
                invoice.order_id
            )));
        }
        state.invoices.insert(invoice.id.clone(), invoice);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        Ok(self.lock().invoices.get(id).cloned())
    }

    async fn get_by_order(&self, order_id: &str) -> Result<Option<Invoice>, StoreError> {
        Ok(self
            .lock()
            .invoices
            .values()
            .find(|i| i.order_id == order_id)
            .cloned())
    }

    async fn mark_sent(&self, id: &str, sent_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let Some(invoice) = state.invoices.get_mut(id) else {
            return Ok(false);
        };
        if invoice.sent_at.is_some() {
            return Ok(false);
        }
        invoice.sent_at = Some(sent_at);
        Ok(true)
    }

    async fn is_event_processed(&self, event_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock().processed.contains(&event_id))
    }

    async fn mark_event_processed(
        &self,
        event_id: Uuid,
        _event_type: &str,
        _source: &str,
    ) -> Result<(), StoreError> {
        self.lock().processed.insert(event_id);
        Ok(())
    }

    async fn quarantine_event(&self, event: QuarantinedEvent) -> Result<(), StoreError> {
        self.lock().quarantined.push(event);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(id: &str, order_id: &str) -> Invoice {
        Invoice {
            id: id.to_string(),
            order_id: order_id.to_string(),
            seller_id: "s1".to_string(),
            pdf_path: "/tmp/inv.pdf".to_string(),
            uploaded_at: Utc::now(),
            sent_at: None,
        }
    }

    #[tokio::test]
    async fn test_mark_sent_transitions_at_most_once() {
        let store = InMemoryInvoiceStore::new();
        store.insert(invoice("i1", "o1")).await.unwrap();

        assert!(store.mark_sent("i1", Utc::now()).await.unwrap());
        assert!(!store.mark_sent("i1", Utc::now()).await.unwrap());

        let stored = store.get("i1").await.unwrap().unwrap();
        assert!(stored.sent_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_sent_on_missing_invoice_is_false() {
        let store = InMemoryInvoiceStore::new();
        assert!(!store.mark_sent("nope", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn test_order_id_lookup_is_unique() {
        let store = InMemoryInvoiceStore::new();
        store.insert(invoice("i1", "o1")).await.unwrap();

        let result = store.insert(invoice("i2", "o1")).await;
        assert!(result.is_err());

        let found = store.get_by_order("o1").await.unwrap().unwrap();
        assert_eq!(found.id, "i1");
    }
}
