//! In-memory order store for dev/test.
//!
//! A single mutex guards the whole state, so every trait method is one
//! critical section — the same atomicity the Postgres store gets from
//! single-statement conditional updates.

use super::{OrderStore, QuarantinedEvent, StoreError};
use crate::models::{Order, OrderStatus, UpdateOrderRequest};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemState {
    orders: HashMap<String, Order>,
    processed: HashSet<Uuid>,
    quarantined: Vec<QuarantinedEvent>,
}

/// In-memory implementation of [`OrderStore`]
#[derive(Default)]
pub struct InMemoryOrderStore {
    state: Mutex<MemState>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        // A poisoned mutex means a panic mid-update; tests surface it.
        self.state.lock().expect("order store mutex poisoned")
    }

    /// Quarantined events, for test assertions
    pub fn quarantined(&self) -> Vec<QuarantinedEvent> {
        self.lock().quarantined.clone()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), StoreError> {
        self.lock().orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self.lock().orders.values().cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }

    async fn update_fields(
        &self,
        id: &str,
        patch: &UpdateOrderRequest,
    ) -> Result<Option<Order>, StoreError> {
        let mut state = self.lock();
        let Some(order) = state.orders.get_mut(id) else {
            return Ok(None);
        };

        if let Some(price) = patch.price {
            order.price = price;
        }
        if let Some(quantity) = patch.quantity {
            order.quantity = quantity as i32;
        }
        if let Some(product_id) = &patch.product_id {
            order.product_id = product_id.clone();
        }
        if let Some(customer_id) = &patch.customer_id {
            order.customer_id = customer_id.clone();
        }
        if let Some(seller_id) = &patch.seller_id {
            order.seller_id = seller_id.clone();
        }

        Ok(Some(order.clone()))
    }

    async fn set_status(
        &self,
        id: &str,
        status: OrderStatus,
    ) -> Result<Option<Order>, StoreError> {
        let mut state = self.lock();
        let Some(order) = state.orders.get_mut(id) else {
            return Ok(None);
        };
        order.status = status;
        Ok(Some(order.clone()))
    }

    async fn attach_invoice(
        &self,
        id: &str,
        invoice_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let mut state = self.lock();
        let Some(order) = state.orders.get_mut(id) else {
            return Ok(None);
        };
        if order.invoice_id.is_none() {
            order.invoice_id = Some(invoice_id.to_string());
        }
        Ok(Some(order.clone()))
    }

    async fn claim_invoice_send(&self, id: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let Some(order) = state.orders.get_mut(id) else {
            return Ok(false);
        };
        if order.status == OrderStatus::Shipped
            && order.invoice_id.is_some()
            && !order.invoice_send_emitted
        {
            order.invoice_send_emitted = true;
            return Ok(true);
        }
        Ok(false)
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
    use chrono::Utc;

    fn order(id: &str) -> Order {
        Order {
            id: id.to_string(),
            status: OrderStatus::Created,
            price: 10.0,
            quantity: 1,
            product_id: "p1".to_string(),
            customer_id: "c1".to_string(),
            seller_id: "s1".to_string(),
            invoice_id: None,
            invoice_send_emitted: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_attach_invoice_is_set_at_most_once() {
        let store = InMemoryOrderStore::new();
        store.insert(order("o1")).await.unwrap();

        store.attach_invoice("o1", "inv-1").await.unwrap();
        let after = store.attach_invoice("o1", "inv-2").await.unwrap().unwrap();

        assert_eq!(after.invoice_id.as_deref(), Some("inv-1"));
    }

    #[tokio::test]
    async fn test_claim_requires_joint_predicate() {
        let store = InMemoryOrderStore::new();
        store.insert(order("o1")).await.unwrap();

        // Neither condition holds
        assert!(!store.claim_invoice_send("o1").await.unwrap());

        // Shipped but no invoice
        store.set_status("o1", OrderStatus::Shipped).await.unwrap();
        assert!(!store.claim_invoice_send("o1").await.unwrap());

        // Both hold: first claim wins, second loses
        store.attach_invoice("o1", "inv-1").await.unwrap();
        assert!(store.claim_invoice_send("o1").await.unwrap());
        assert!(!store.claim_invoice_send("o1").await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_on_missing_order_is_false() {
        let store = InMemoryOrderStore::new();
        assert!(!store.claim_invoice_send("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_inbox_dedup() {
        let store = InMemoryOrderStore::new();
        let event_id = Uuid::new_v4();

        assert!(!store.is_event_processed(event_id).await.unwrap());
        store
            .mark_event_processed(event_id, "INVOICE_UPLOADED", "invoicing")
            .await
            .unwrap();
        assert!(store.is_event_processed(event_id).await.unwrap());
    }
}
