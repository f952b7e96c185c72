//! Order aggregate: command handlers plus the INVOICE_UPLOADED event handler.
//!
//! Every command persists first, publishes second. When a publish fails
//! after the bounded retry budget, the persisted state stays and the error
//! surfaces to the caller — the lost downstream notification is a known
//! at-least-once-minus gap of this design.

use crate::error::OrderError;
use crate::events::publisher;
use crate::models::{CreateOrderRequest, Order, OrderStatus, UpdateOrderRequest};
use crate::store::{OrderStore, StoreError};
use crate::validation;
use chrono::Utc;
use event_bus::retry::RetryConfig;
use event_bus::EventBus;
use platform_contracts::{EventType, InvoiceSendPayload, OrderCreatedPayload};
use std::sync::Arc;
use uuid::Uuid;

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    bus: Arc<dyn EventBus>,
    retry: RetryConfig,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            store,
            bus,
            retry: RetryConfig::default(),
        }
    }

    /// The store handle, shared with the event consumer (inbox/quarantine)
    /// and with tests that assert on persisted state.
    pub fn store(&self) -> Arc<dyn OrderStore> {
        self.store.clone()
    }

    /// Create an order and publish ORDER_CREATED.
    ///
    /// The record is durably persisted before the event goes out; a consumer
    /// reacting to ORDER_CREATED can always read the order back.
    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<Order, OrderError> {
        validation::validate_create(&req)?;

        let order = Order {
            id: Uuid::new_v4().to_string(),
            status: OrderStatus::Created,
            price: req.price,
            quantity: req.quantity as i32,
            product_id: req.product_id,
            customer_id: req.customer_id,
            seller_id: req.seller_id,
            invoice_id: None,
            invoice_send_emitted: false,
            created_at: Utc::now(),
        };

        self.store.insert(order.clone()).await?;

        publisher::publish_event(
            self.bus.as_ref(),
            &self.retry,
            EventType::OrderCreated,
            OrderCreatedPayload {
                order_id: order.id.clone(),
                customer_id: order.customer_id.clone(),
                seller_id: order.seller_id.clone(),
            },
            Some(order.id.clone()),
        )
        .await?;

        tracing::info!(order_id = %order.id, "Order created");
        Ok(order)
    }

    pub async fn get_order(&self, id: &str) -> Result<Order, OrderError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list().await?)
    }

    /// Apply an update patch. A patch carrying `status` routes through the
    /// status path (which owns the INVOICE_SEND side effect); any other
    /// patch is a plain field update with no side-effect triggering.
    pub async fn update_order(
        &self,
        id: &str,
        patch: UpdateOrderRequest,
    ) -> Result<Order, OrderError> {
        validation::validate_patch(&patch)?;

        if let Some(status) = patch.status {
            return self.update_status(id, status).await;
        }

        self.store
            .update_fields(id, &patch)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))
    }

    /// Write a new status. On the transition into SHIPPED this attempts the
    /// INVOICE_SEND claim: the publish happens iff this call is the one that
    /// newly satisfies the joint predicate (shipped + invoice attached).
    pub async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let updated = self
            .store
            .set_status(id, status)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))?;

        if status == OrderStatus::Shipped && self.store.claim_invoice_send(id).await? {
            self.publish_invoice_send(id).await?;
            // Re-read so the response reflects the claimed flag.
            return self.get_order(id).await;
        }

        Ok(updated)
    }

    /// INVOICE_UPLOADED handler: attach the invoice id (set-at-most-once)
    /// and attempt the INVOICE_SEND claim. Idempotent — redelivery finds the
    /// invoice already attached and the claim already taken.
    pub async fn on_invoice_uploaded(
        &self,
        invoice_id: &str,
        order_id: &str,
    ) -> Result<(), OrderError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        if let Some(existing) = &order.invoice_id {
            if existing != invoice_id {
                tracing::warn!(
                    order_id = %order_id,
                    attached = %existing,
                    ignored = %invoice_id,
                    "Order already has an invoice attached; keeping the first"
                );
            }
        }

        self.store.attach_invoice(order_id, invoice_id).await?;

        if self.store.claim_invoice_send(order_id).await? {
            self.publish_invoice_send(order_id).await?;
        }

        Ok(())
    }

    /// Publish INVOICE_SEND for an order whose claim THIS caller just won.
    ///
    /// The invoice id is re-read after the claim: the winning claim proves
    /// `invoice_id` was set at flip time, and it is never unset, so the read
    /// cannot race back to `None` — even when the status path wins off a
    /// snapshot taken before the handler attached the invoice.
    async fn publish_invoice_send(&self, order_id: &str) -> Result<(), OrderError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;

        let invoice_id = order.invoice_id.ok_or_else(|| {
            OrderError::Store(StoreError::Backend(
                "invoice_send claim won without an attached invoice".to_string(),
            ))
        })?;

        publisher::publish_event(
            self.bus.as_ref(),
            &self.retry,
            EventType::InvoiceSend,
            InvoiceSendPayload {
                invoice_id,
                order_id: order_id.to_string(),
            },
            Some(order_id.to_string()),
        )
        .await?;

        tracing::info!(order_id = %order_id, "INVOICE_SEND published");
        Ok(())
    }

    /// Store connectivity, for the health endpoint.
    pub async fn store_healthy(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}
