use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Schema version stamped into every envelope produced by this workspace
pub const EVENT_SCHEMA_VERSION: &str = "1";

/// The closed set of event type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    OrderCreated,
    InvoiceUploaded,
    InvoiceSend,
    InvoiceSent,
}

impl EventType {
    /// Wire tag carried in the envelope's `eventType` field
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::OrderCreated => "ORDER_CREATED",
            EventType::InvoiceUploaded => "INVOICE_UPLOADED",
            EventType::InvoiceSend => "INVOICE_SEND",
            EventType::InvoiceSent => "INVOICE_SENT",
        }
    }

    /// Bus subject this event type is published to
    pub const fn subject(&self) -> &'static str {
        match self {
            EventType::OrderCreated => "orders.events.order.created",
            EventType::InvoiceUploaded => "invoicing.events.invoice.uploaded",
            EventType::InvoiceSend => "orders.events.invoice.send",
            EventType::InvoiceSent => "invoicing.events.invoice.sent",
        }
    }

    /// Parse a wire tag; `None` for tags outside the catalog
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "ORDER_CREATED" => Some(EventType::OrderCreated),
            "INVOICE_UPLOADED" => Some(EventType::InvoiceUploaded),
            "INVOICE_SEND" => Some(EventType::InvoiceSend),
            "INVOICE_SENT" => Some(EventType::InvoiceSent),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for ORDER_CREATED
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedPayload {
    pub order_id: String,
    pub customer_id: String,
    pub seller_id: String,
}

/// Payload for INVOICE_UPLOADED
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUploadedPayload {
    pub invoice_id: String,
    pub order_id: String,
}

/// Payload for INVOICE_SEND
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSendPayload {
    pub invoice_id: String,
    pub order_id: String,
}

/// Payload for INVOICE_SENT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSentPayload {
    pub invoice_id: String,
    pub order_id: String,
    pub sent_at: DateTime<Utc>,
}

/// Errors raised when decoding an event against the catalog
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("invalid payload for {event_type}: {reason}")]
    InvalidPayload { event_type: String, reason: String },
}

/// A fully-decoded catalog event: one variant per tag, so consumers match
/// exhaustively and the compiler flags any catalog growth they miss.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoreographyEvent {
    OrderCreated(OrderCreatedPayload),
    InvoiceUploaded(InvoiceUploadedPayload),
    InvoiceSend(InvoiceSendPayload),
    InvoiceSent(InvoiceSentPayload),
}

impl ChoreographyEvent {
    /// Decode a `(eventType, payload)` pair against the catalog.
    ///
    /// # Errors
    /// * [`ContractError::UnknownEventType`] for tags outside the closed set
    /// * [`ContractError::InvalidPayload`] when the payload does not match
    ///   the shape the tag mandates
    pub fn decode(event_type: &str, payload: &serde_json::Value) -> Result<Self, ContractError> {
        let tag = EventType::parse(event_type)
            .ok_or_else(|| ContractError::UnknownEventType(event_type.to_string()))?;

        let invalid = |e: serde_json::Error| ContractError::InvalidPayload {
            event_type: event_type.to_string(),
            reason: e.to_string(),
        };

        match tag {
            EventType::OrderCreated => serde_json::from_value(payload.clone())
                .map(ChoreographyEvent::OrderCreated)
                .map_err(invalid),
            EventType::InvoiceUploaded => serde_json::from_value(payload.clone())
                .map(ChoreographyEvent::InvoiceUploaded)
                .map_err(invalid),
            EventType::InvoiceSend => serde_json::from_value(payload.clone())
                .map(ChoreographyEvent::InvoiceSend)
                .map_err(invalid),
            EventType::InvoiceSent => serde_json::from_value(payload.clone())
                .map(ChoreographyEvent::InvoiceSent)
                .map_err(invalid),
        }
    }

    /// The catalog tag of this event
    pub const fn event_type(&self) -> EventType {
        match self {
            ChoreographyEvent::OrderCreated(_) => EventType::OrderCreated,
            ChoreographyEvent::InvoiceUploaded(_) => EventType::InvoiceUploaded,
            ChoreographyEvent::InvoiceSend(_) => EventType::InvoiceSend,
            ChoreographyEvent::InvoiceSent(_) => EventType::InvoiceSent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_round_trip() {
        for tag in [
            EventType::OrderCreated,
            EventType::InvoiceUploaded,
            EventType::InvoiceSend,
            EventType::InvoiceSent,
        ] {
            assert_eq!(EventType::parse(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn test_subjects_are_scoped_by_producer() {
        assert_eq!(
            EventType::OrderCreated.subject(),
            "orders.events.order.created"
        );
        assert_eq!(
            EventType::InvoiceSend.subject(),
            "orders.events.invoice.send"
        );
        assert_eq!(
            EventType::InvoiceUploaded.subject(),
            "invoicing.events.invoice.uploaded"
        );
        assert_eq!(
            EventType::InvoiceSent.subject(),
            "invoicing.events.invoice.sent"
        );
    }

    #[test]
    fn test_decode_order_created() {
        let payload = json!({
            "orderId": "o-1",
            "customerId": "c-1",
            "sellerId": "s-1"
        });

        let event = ChoreographyEvent::decode("ORDER_CREATED", &payload).unwrap();
        assert_eq!(
            event,
            ChoreographyEvent::OrderCreated(OrderCreatedPayload {
                order_id: "o-1".to_string(),
                customer_id: "c-1".to_string(),
                seller_id: "s-1".to_string(),
            })
        );
        assert_eq!(event.event_type(), EventType::OrderCreated);
    }

    #[test]
    fn test_decode_invoice_sent_carries_timestamp() {
        let payload = json!({
            "invoiceId": "i-1",
            "orderId": "o-1",
            "sentAt": "2025-06-01T12:00:00Z"
        });

        let event = ChoreographyEvent::decode("INVOICE_SENT", &payload).unwrap();
        let ChoreographyEvent::InvoiceSent(sent) = event else {
            panic!("wrong variant");
        };
        assert_eq!(sent.invoice_id, "i-1");
        assert_eq!(sent.sent_at.to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let result = ChoreographyEvent::decode("ORDER_DELETED", &json!({}));
        assert!(matches!(result, Err(ContractError::UnknownEventType(tag)) if tag == "ORDER_DELETED"));
    }

    #[test]
    fn test_payload_shape_mismatch_is_rejected() {
        let result = ChoreographyEvent::decode("INVOICE_SEND", &json!({"invoiceId": "i-1"}));
        assert!(matches!(
            result,
            Err(ContractError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_payload_wire_shape_is_camel_case() {
        let payload = OrderCreatedPayload {
            order_id: "o-1".to_string(),
            customer_id: "c-1".to_string(),
            seller_id: "s-1".to_string(),
        };

        let wire = serde_json::to_value(&payload).unwrap();
        assert!(wire.get("orderId").is_some());
        assert!(wire.get("order_id").is_none());
    }
}
