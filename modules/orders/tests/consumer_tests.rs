//! Consumer pipeline behavior: inbox dedup, catalog enforcement, quarantine.

use event_bus::{EventBus, EventEnvelope, InMemoryBus};
use orders_rs::models::{CreateOrderRequest, OrderStatus};
use orders_rs::service::OrderService;
use orders_rs::start_invoice_uploaded_consumer;
use orders_rs::store::{InMemoryOrderStore, OrderStore};
use platform_contracts::{EventType, InvoiceUploadedPayload, EVENT_SCHEMA_VERSION};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Harness {
    service: Arc<OrderService>,
    bus: Arc<InMemoryBus>,
    store: Arc<InMemoryOrderStore>,
}

async fn start_harness() -> Harness {
    let store = Arc::new(InMemoryOrderStore::new());
    let bus = Arc::new(InMemoryBus::new());
    let service = Arc::new(OrderService::new(store.clone(), bus.clone()));

    start_invoice_uploaded_consumer(bus.clone(), service.clone())
        .await
        .expect("subscribe failed");

    Harness {
        service,
        bus,
        store,
    }
}

async fn create_order(harness: &Harness) -> String {
    harness
        .service
        .create_order(CreateOrderRequest {
            price: 50.0,
            quantity: 1,
            product_id: "p1".to_string(),
            customer_id: "c1".to_string(),
            seller_id: "s1".to_string(),
        })
        .await
        .unwrap()
        .id
}

fn uploaded_envelope(invoice_id: &str, order_id: &str) -> EventEnvelope<InvoiceUploadedPayload> {
    EventEnvelope::new(
        EventType::InvoiceUploaded.as_str(),
        EVENT_SCHEMA_VERSION,
        "invoicing",
        InvoiceUploadedPayload {
            invoice_id: invoice_id.to_string(),
            order_id: order_id.to_string(),
        },
    )
}

async fn publish(harness: &Harness, envelope: &serde_json::Value) {
    harness
        .bus
        .publish(
            EventType::InvoiceUploaded.subject(),
            serde_json::to_vec(envelope).unwrap(),
        )
        .await
        .unwrap();
}

/// Poll until the condition holds or the deadline passes.
async fn wait_for<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_uploaded_event_attaches_invoice() {
    let harness = start_harness().await;
    let order_id = create_order(&harness).await;

    let envelope = serde_json::to_value(uploaded_envelope("inv1", &order_id)).unwrap();
    publish(&harness, &envelope).await;

    let store = harness.store.clone();
    let id = order_id.clone();
    assert!(
        wait_for(|| {
            let store = store.clone();
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
}

#[tokio::test]
async fn test_redelivered_envelope_is_deduplicated() {
    let harness = start_harness().await;
    let order_id = create_order(&harness).await;
    harness
        .service
        .update_status(&order_id, OrderStatus::Shipped)
        .await
        .unwrap();

    let mut sends = harness
        .bus
        .subscribe(EventType::InvoiceSend.subject())
        .await
        .unwrap();

    // Same envelope delivered twice: the inbox makes the second a no-op.
    let envelope = serde_json::to_value(uploaded_envelope("inv1", &order_id)).unwrap();
    publish(&harness, &envelope).await;
    publish(&harness, &envelope).await;

    let event_id = Uuid::parse_str(envelope["eventId"].as_str().unwrap()).unwrap();
    let store = harness.store.clone();
    assert!(
        wait_for(|| {
            let store = store.clone();
            async move { store.is_event_processed(event_id).await.unwrap() }
        })
        .await
    );

    let mut send_count = 0;
    while let Ok(Some(_)) =
        tokio::time::timeout(Duration::from_millis(200), futures::StreamExt::next(&mut sends))
            .await
    {
        send_count += 1;
    }
    assert_eq!(send_count, 1);
}

#[tokio::test]
async fn test_unknown_event_type_is_quarantined() {
    let harness = start_harness().await;

    // A tag outside the catalog arriving on our subject: logged + quarantined.
    let rogue = serde_json::json!({
        "eventId": Uuid::new_v4().to_string(),
        "eventType": "INVOICE_SHREDDED",
        "version": "1",
        "metadata": { "source": "invoicing" },
        "payload": {}
    });
    publish(&harness, &rogue).await;

    let store = harness.store.clone();
    assert!(
        wait_for(|| {
            let store = store.clone();
            async move { !store.quarantined().is_empty() }
        })
        .await,
        "rogue event never quarantined"
    );

    let quarantined = harness.store.quarantined();
    assert_eq!(quarantined.len(), 1);
    assert!(quarantined[0].error.contains("unknown event type"));
}

#[tokio::test]
async fn test_handler_failure_is_retried_then_quarantined() {
    let harness = start_harness().await;

    // References an order that does not exist: NotFound on every attempt,
    // then quarantine instead of a silent drop.
    let envelope = serde_json::to_value(uploaded_envelope("inv1", "no-such-order")).unwrap();
    publish(&harness, &envelope).await;

    let store = harness.store.clone();
    assert!(
        wait_for(|| {
            let store = store.clone();
            async move { !store.quarantined().is_empty() }
        })
        .await,
        "failed event never quarantined"
    );

    let quarantined = harness.store.quarantined();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(quarantined[0].subject, EventType::InvoiceUploaded.subject());
    assert!(quarantined[0].retry_count > 0);

    // The failed envelope was not marked processed.
    let event_id = Uuid::parse_str(envelope["eventId"].as_str().unwrap()).unwrap();
    assert!(!harness.store.is_event_processed(event_id).await.unwrap());
}

#[tokio::test]
async fn test_garbage_payload_does_not_kill_the_consumer() {
    let harness = start_harness().await;
    let order_id = create_order(&harness).await;

    // Not JSON at all — logged and skipped.
    harness
        .bus
        .publish(EventType::InvoiceUploaded.subject(), b"not json".to_vec())
        .await
        .unwrap();

    // The loop must still be alive to process a valid envelope.
    let envelope = serde_json::to_value(uploaded_envelope("inv1", &order_id)).unwrap();
    publish(&harness, &envelope).await;

    let store = harness.store.clone();
    let id = order_id.clone();
    assert!(
        wait_for(|| {
            let store = store.clone();
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
        .await
    );
}
