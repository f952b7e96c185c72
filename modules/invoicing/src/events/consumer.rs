//! Consumer for INVOICE_SEND events from the orders service.
//!
//! Per-message pipeline: envelope validation → inbox dedup (eventId) →
//! catalog decode → handler under bounded retry → quarantine on exhaustion.
//! A failing message never crashes the consumer loop and is never silently
//! dropped.

use crate::service::InvoiceService;
use crate::store::{InvoiceStore, QuarantinedEvent};
use event_bus::retry::{retry_with_backoff, RetryConfig};
use event_bus::{validate_envelope_fields, BusMessage, BusResult, EventBus};
use futures::StreamExt;
use platform_contracts::{ChoreographyEvent, EventType};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Subscribe to invoice-send events and spawn the consumer loop.
///
/// The subscription is established before this function returns, so a
/// broker failure here is visible at startup (callers treat it as fatal)
/// and no event published after startup can be missed.
pub async fn start_invoice_send_consumer(
    bus: Arc<dyn EventBus>,
    service: Arc<InvoiceService>,
) -> BusResult<()> {
    let subject = EventType::InvoiceSend.subject();
    let mut stream = bus.subscribe(subject).await?;
    tracing::info!(subject = %subject, "Subscribed");

    tokio::spawn(async move {
        let retry_config = RetryConfig::default();
        while let Some(msg) = stream.next().await {
            handle_message(&service, &retry_config, &msg).await;
        }
        tracing::warn!(subject = %subject, "Invoice send consumer stopped");
    });

    Ok(())
}

async fn handle_message(
    service: &Arc<InvoiceService>,
    retry_config: &RetryConfig,
    msg: &BusMessage,
) {
    let envelope: serde_json::Value = match serde_json::from_slice(&msg.payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(subject = %msg.subject, error = %e, "Discarding undecodable message");
            return;
        }
    };

    if let Err(e) = validate_envelope_fields(&envelope) {
        tracing::error!(subject = %msg.subject, error = %e, "Discarding invalid envelope");
        return;
    }

    // Validation guarantees these fields exist and parse.
    let event_id = envelope
        .get("eventId")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_default();
    let event_type = envelope
        .get("eventType")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let source = envelope
        .get("metadata")
        .and_then(|m| m.get("source"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let correlation_id = envelope
        .get("metadata")
        .and_then(|m| m.get("correlationId"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let span = tracing::info_span!(
        "process_event",
        event_id = %event_id,
        subject = %msg.subject,
        event_type = %event_type,
        correlation_id = %correlation_id.as_deref().unwrap_or("none"),
        source = %source
    );

    async {
        let store = service.store();

        match store.is_event_processed(event_id).await {
            Ok(true) => {
                tracing::info!("Duplicate event ignored (already processed)");
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(error = %e, "Inbox lookup failed; leaving event unprocessed");
                return;
            }
        }

        let payload = envelope
            .get("payload")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let event = match ChoreographyEvent::decode(&event_type, &payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Rejecting event that violates the catalog");
                quarantine(service, event_id, &msg.subject, &envelope, &e.to_string(), 0).await;
                return;
            }
        };

        let result = retry_with_backoff(
            || {
                let event = event.clone();
                async move {
                    match event {
                        ChoreographyEvent::InvoiceSend(p) => service
                            .on_invoice_send(&p.invoice_id, &p.order_id)
                            .await
                            .map_err(|e| e.to_string()),
                        other => Err(format!(
                            "unexpected {} on subject {}",
                            other.event_type(),
                            msg.subject
                        )),
                    }
                }
            },
            retry_config,
            "invoicing_invoice_send_consumer",
        )
        .await;

        match result {
            Ok(()) => {
                if let Err(e) = store
                    .mark_event_processed(event_id, &event_type, &source)
                    .await
                {
                    // The handler is idempotent, so a redelivery after this
                    // miss re-runs it harmlessly.
                    tracing::warn!(error = %e, "Failed to mark event processed");
                }
                tracing::info!("Event processed");
            }
            Err(error_msg) => {
                tracing::error!(
                    error = %error_msg,
                    retry_count = retry_config.max_attempts,
                    "Event processing failed after retries, quarantining"
                );
                quarantine(
                    service,
                    event_id,
                    &msg.subject,
                    &envelope,
                    &error_msg,
                    retry_config.max_attempts as i32,
                )
                .await;
            }
        }
    }
    .instrument(span)
    .await;
}

async fn quarantine(
    service: &Arc<InvoiceService>,
    event_id: Uuid,
    subject: &str,
    envelope: &serde_json::Value,
    error: &str,
    retry_count: i32,
) {
    let quarantined = QuarantinedEvent {
        event_id,
        subject: subject.to_string(),
        envelope: envelope.clone(),
        error: error.to_string(),
        retry_count,
    };

    if let Err(e) = service.store().quarantine_event(quarantined).await {
        tracing::error!(
            event_id = %event_id,
            error = %e,
            "Failed to quarantine event; it remains unprocessed"
        );
    }
}
