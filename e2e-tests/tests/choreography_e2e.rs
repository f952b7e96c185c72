//! Full choreography over one shared bus: both services' consumers running,
//! no orchestrator, convergence asserted on the stores.
//!
//! Flow under test:
//!   create order → ship → upload invoice
//!     → INVOICE_UPLOADED → orders attaches invoice, claims, INVOICE_SEND
//!     → invoicing sets sentAt, INVOICE_SENT
//! with exactly one INVOICE_SEND and one INVOICE_SENT per order, whatever
//! the trigger order and despite duplicate delivery.

use event_bus::{BusMessage, EventBus, InMemoryBus};
use futures::stream::BoxStream;
use futures::StreamExt;
use invoicing_rs::service::InvoiceService;
use invoicing_rs::store::{InMemoryInvoiceStore, InvoiceStore};
use orders_rs::models::{CreateOrderRequest, OrderStatus};
use orders_rs::service::OrderService;
use orders_rs::store::{InMemoryOrderStore, OrderStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const PDF: &[u8] = b"%PDF-1.7\ninvoice body";

struct World {
    orders: Arc<OrderService>,
    invoicing: Arc<InvoiceService>,
    order_store: Arc<dyn OrderStore>,
    invoice_store: Arc<dyn InvoiceStore>,
    bus: Arc<InMemoryBus>,
    upload_root: PathBuf,
}

impl Drop for World {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_root);
    }
}

/// Wire both services to one bus and start both consumers, the way each
/// service's main does.
async fn start_world() -> World {
    let bus = Arc::new(InMemoryBus::new());

    let order_store: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
    let orders = Arc::new(OrderService::new(order_store.clone(), bus.clone()));

    let invoice_store: Arc<dyn InvoiceStore> = Arc::new(InMemoryInvoiceStore::new());
    let upload_root = std::env::temp_dir().join(format!("choreography-e2e-{}", Uuid::new_v4()));
    let invoicing = Arc::new(InvoiceService::new(
        invoice_store.clone(),
        bus.clone(),
        upload_root.clone(),
    ));

    orders_rs::start_invoice_uploaded_consumer(bus.clone(), orders.clone())
        .await
        .expect("orders consumer subscribe failed");
    invoicing_rs::start_invoice_send_consumer(bus.clone(), invoicing.clone())
        .await
        .expect("invoicing consumer subscribe failed");

    World {
        orders,
        invoicing,
        order_store,
        invoice_store,
        bus,
        upload_root,
    }
}

async fn create_order(world: &World) -> String {
    world
        .orders
        .create_order(CreateOrderRequest {
            price: 199.99,
            quantity: 3,
            product_id: "p1".to_string(),
            customer_id: "c1".to_string(),
            seller_id: "s1".to_string(),
        })
        .await
        .unwrap()
        .id
}

/// Poll until the condition holds or a 2s deadline passes.
async fn wait_for<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Drain every message that arrives until the stream goes quiet.
async fn drain(stream: &mut BoxStream<'static, BusMessage>) -> Vec<BusMessage> {
    let mut messages = Vec::new();
    while let Ok(Some(msg)) =
        tokio::time::timeout(Duration::from_millis(300), stream.next()).await
    {
        messages.push(msg);
    }
    messages
}

async fn assert_converged(world: &World, order_id: &str) {
    // Invoice attached to the order...
    let order_store = world.order_store.clone();
    let id = order_id.to_string();
    assert!(
        wait_for(|| {
            let store = order_store.clone();
            let id = id.clone();
            async move {
                store
                    .get(&id)
                    .await
                    .unwrap()
                    .map(|o| o.invoice_id.is_some() && o.invoice_send_emitted)
                    .unwrap_or(false)
            }
        })
        .await,
        "order never converged (invoice attached + claim taken)"
    );

    // ...and the invoice marked sent.
    let invoice_store = world.invoice_store.clone();
    let id = order_id.to_string();
    assert!(
        wait_for(|| {
            let store = invoice_store.clone();
            let id = id.clone();
            async move {
                store
                    .get_by_order(&id)
                    .await
                    .unwrap()
                    .map(|i| i.sent_at.is_some())
                    .unwrap_or(false)
            }
        })
        .await,
        "invoice never marked sent"
    );
}

fn count_by_type(messages: &[BusMessage], event_type: &str) -> usize {
    messages
        .iter()
        .filter(|m| {
            serde_json::from_slice::<serde_json::Value>(&m.payload)
                .map(|v| v["eventType"] == event_type)
                .unwrap_or(false)
        })
        .count()
}

#[tokio::test]
async fn test_ship_then_upload_converges_with_one_send_and_one_sent() {
    let world = start_world().await;
    let mut all_events = world.bus.subscribe(">").await.unwrap();

    let order_id = create_order(&world).await;
    world
        .orders
        .update_status(&order_id, OrderStatus::Shipped)
        .await
        .unwrap();

    world
        .invoicing
        .upload(
            invoicing_rs::UploadInvoiceRequest {
                order_id: order_id.clone(),
                seller_id: "s1".to_string(),
            },
            PDF.to_vec(),
            "inv.pdf",
        )
        .await
        .unwrap();

    assert_converged(&world, &order_id).await;

    let events = drain(&mut all_events).await;
    assert_eq!(count_by_type(&events, "ORDER_CREATED"), 1);
    assert_eq!(count_by_type(&events, "INVOICE_UPLOADED"), 1);
    assert_eq!(count_by_type(&events, "INVOICE_SEND"), 1);
    assert_eq!(count_by_type(&events, "INVOICE_SENT"), 1);
}

#[tokio::test]
async fn test_upload_before_ship_converges_with_one_send_and_one_sent() {
    let world = start_world().await;
    let mut all_events = world.bus.subscribe(">").await.unwrap();

    let order_id = create_order(&world).await;

    // Upload first: INVOICE_UPLOADED attaches the invoice with no send yet.
    world
        .invoicing
        .upload(
            invoicing_rs::UploadInvoiceRequest {
                order_id: order_id.clone(),
                seller_id: "s1".to_string(),
            },
            PDF.to_vec(),
            "inv.pdf",
        )
        .await
        .unwrap();

    let order_store = world.order_store.clone();
    let id = order_id.clone();
    assert!(
        wait_for(|| {
            let store = order_store.clone();
            let id = id.clone();
            async move {
                store
                    .get(&id)
                    .await
                    .unwrap()
                    .and_then(|o| o.invoice_id)
                    .is_some()
            }
        })
        .await,
        "invoice never attached"
    );

    // The later SHIPPED update completes the predicate.
    world
        .orders
        .update_status(&order_id, OrderStatus::Shipped)
        .await
        .unwrap();

    assert_converged(&world, &order_id).await;

    let events = drain(&mut all_events).await;
    assert_eq!(count_by_type(&events, "INVOICE_SEND"), 1);
    assert_eq!(count_by_type(&events, "INVOICE_SENT"), 1);
}

#[tokio::test]
async fn test_duplicate_invoice_send_delivery_produces_one_sent() {
    let world = start_world().await;

    let order_id = create_order(&world).await;
    world
        .orders
        .update_status(&order_id, OrderStatus::Shipped)
        .await
        .unwrap();

    let mut sent_events = world
        .bus
        .subscribe("invoicing.events.invoice.sent")
        .await
        .unwrap();

    world
        .invoicing
        .upload(
            invoicing_rs::UploadInvoiceRequest {
                order_id: order_id.clone(),
                seller_id: "s1".to_string(),
            },
            PDF.to_vec(),
            "inv.pdf",
        )
        .await
        .unwrap();

    assert_converged(&world, &order_id).await;

    // Simulate the log redelivering the INVOICE_SEND envelope verbatim.
    let invoice = world.invoice_store.get_by_order(&order_id).await.unwrap().unwrap();
    let redelivery = serde_json::json!({
        "eventId": Uuid::new_v4().to_string(),
        "eventType": "INVOICE_SEND",
        "version": "1",
        "metadata": { "source": "orders" },
        "payload": { "invoiceId": invoice.id, "orderId": order_id }
    });
    world
        .bus
        .publish(
            "orders.events.invoice.send",
            serde_json::to_vec(&redelivery).unwrap(),
        )
        .await
        .unwrap();

    // sentAt stays put and no second INVOICE_SENT appears.
    let events = drain(&mut sent_events).await;
    assert_eq!(events.len(), 1);

    let after = world.invoice_store.get_by_order(&order_id).await.unwrap().unwrap();
    assert_eq!(after.sent_at, invoice.sent_at);
}

#[tokio::test]
async fn test_many_orders_converge_independently() {
    let world = start_world().await;

    let mut order_ids = Vec::new();
    for _ in 0..5 {
        let order_id = create_order(&world).await;
        world
            .orders
            .update_status(&order_id, OrderStatus::Shipped)
            .await
            .unwrap();
        world
            .invoicing
            .upload(
                invoicing_rs::UploadInvoiceRequest {
                    order_id: order_id.clone(),
                    seller_id: "s1".to_string(),
                },
                PDF.to_vec(),
                "inv.pdf",
            )
            .await
            .unwrap();
        order_ids.push(order_id);
    }

    for order_id in &order_ids {
        assert_converged(&world, order_id).await;
    }
}
