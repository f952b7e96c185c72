//! # Event Envelope
//!
//! Canonical envelope wrapped around every event crossing a service boundary.
//!
//! ## Envelope Fields (wire shape is camelCase JSON)
//!
//! - `eventId`: unique per logical occurrence; doubles as the consumer-side
//!   dedup key. A re-emission of the same business fact (publish retry)
//!   reuses the envelope — it never mints a fresh id, which would defeat
//!   dedup.
//! - `eventType`: closed tag from the shared event catalog
//! - `version`: schema version of the payload
//! - `payload`: event-specific data (generic type parameter)
//! - `timestamp`: epoch milliseconds when the event was generated
//! - `metadata.source`: service that produced the event
//! - `metadata.correlationId`: links related events in a business transaction
//! - `metadata.retryCount`: producer-side re-emission counter

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard event envelope shared by every producer and consumer.
///
/// # Type Parameter
///
/// * `T` - The event-specific payload type
///
/// # Examples
///
/// ```rust
/// use event_bus::EventEnvelope;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct OrderCreated {
///     order_id: String,
///     customer_id: String,
/// }
///
/// let envelope = EventEnvelope::new(
///     "ORDER_CREATED",
///     "1",
///     "orders",
///     OrderCreated {
///         order_id: "o-123".to_string(),
///         customer_id: "c-1".to_string(),
///     },
/// )
/// .with_correlation_id(Some("corr-456".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<T> {
    /// Unique event identifier (idempotency key)
    pub event_id: Uuid,

    /// Closed event type tag (e.g. "ORDER_CREATED")
    pub event_type: String,

    /// Schema version of the payload
    pub version: String,

    /// Event-specific payload
    pub payload: T,

    /// Epoch milliseconds when the event was generated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Producer metadata
    pub metadata: EventMetadata,
}

/// Producer metadata carried by every envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// Service that produced the event (e.g. "orders", "invoicing")
    pub source: String,

    /// Links related events in a business transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Producer-side re-emission counter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
}

impl<T> EventEnvelope<T> {
    /// Create a new envelope with a generated event id and current timestamp.
    pub fn new(
        event_type: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
        payload: T,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            version: version.into(),
            payload,
            timestamp: Some(chrono::Utc::now().timestamp_millis()),
            metadata: EventMetadata {
                source: source.into(),
                correlation_id: None,
                retry_count: None,
            },
        }
    }

    /// Create an envelope with an explicit event id (useful for testing)
    pub fn with_event_id(
        event_id: Uuid,
        event_type: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
        payload: T,
    ) -> Self {
        Self {
            event_id,
            ..Self::new(event_type, version, source, payload)
        }
    }

    /// Set the correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.metadata.correlation_id = correlation_id;
        self
    }

    /// Set the producer-side retry counter
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.metadata.retry_count = Some(retry_count);
        self
    }
}

/// Validate the envelope fields of a raw JSON message.
///
/// Every consumer runs this before dispatching to a handler, so malformed
/// messages are rejected with a reason instead of surfacing as payload
/// decode failures deep in handler code.
///
/// # Validation Rules
///
/// - `eventId`: present and a valid UUID string
/// - `eventType`: present and non-empty
/// - `version`: present and non-empty
/// - `metadata.source`: present and non-empty
///
/// `timestamp`, `metadata.correlationId` and `metadata.retryCount` are
/// optional.
pub fn validate_envelope_fields(envelope: &serde_json::Value) -> Result<(), String> {
    let event_id = envelope
        .get("eventId")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid eventId")?;

    Uuid::parse_str(event_id).map_err(|_| format!("eventId is not a valid UUID: {event_id}"))?;

    let event_type = envelope
        .get("eventType")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid eventType")?;

    if event_type.is_empty() {
        return Err("eventType cannot be empty".to_string());
    }

    let version = envelope
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid version")?;

    if version.is_empty() {
        return Err("version cannot be empty".to_string());
    }

    let source = envelope
        .get("metadata")
        .and_then(|m| m.get("source"))
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid metadata.source")?;

    if source.is_empty() {
        return Err("metadata.source cannot be empty".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_creation() {
        let envelope = EventEnvelope::new(
            "ORDER_CREATED",
            "1",
            "orders",
            json!({"orderId": "o-1"}),
        );

        assert_eq!(envelope.event_type, "ORDER_CREATED");
        assert_eq!(envelope.version, "1");
        assert_eq!(envelope.metadata.source, "orders");
        assert!(envelope.timestamp.is_some());
        assert!(envelope.metadata.correlation_id.is_none());
        assert!(envelope.metadata.retry_count.is_none());
    }

    #[test]
    fn test_envelope_with_builder() {
        let envelope = EventEnvelope::new("INVOICE_SEND", "1", "orders", json!({}))
            .with_correlation_id(Some("corr-456".to_string()))
            .with_retry_count(2);

        assert_eq!(
            envelope.metadata.correlation_id,
            Some("corr-456".to_string())
        );
        assert_eq!(envelope.metadata.retry_count, Some(2));
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let envelope = EventEnvelope::new(
            "INVOICE_UPLOADED",
            "1",
            "invoicing",
            json!({"invoiceId": "i-1", "orderId": "o-1"}),
        );

        let wire = serde_json::to_value(&envelope).unwrap();
        assert!(wire.get("eventId").is_some());
        assert!(wire.get("eventType").is_some());
        assert!(wire.get("version").is_some());
        assert!(wire.get("timestamp").is_some());
        assert!(wire.get("metadata").unwrap().get("source").is_some());
        // snake_case must not leak onto the wire
        assert!(wire.get("event_id").is_none());
        assert!(wire.get("event_type").is_none());
    }

    #[test]
    fn test_validate_envelope_fields_valid() {
        let envelope = json!({
            "eventId": "550e8400-e29b-41d4-a716-446655440000",
            "eventType": "ORDER_CREATED",
            "version": "1",
            "timestamp": 1700000000000i64,
            "metadata": { "source": "orders" },
            "payload": {}
        });

        assert!(validate_envelope_fields(&envelope).is_ok());
    }

    #[test]
    fn test_validate_envelope_fields_missing_source() {
        let envelope = json!({
            "eventId": "550e8400-e29b-41d4-a716-446655440000",
            "eventType": "ORDER_CREATED",
            "version": "1",
            "metadata": {}
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }

    #[test]
    fn test_validate_envelope_fields_bad_event_id() {
        let envelope = json!({
            "eventId": "not-a-uuid",
            "eventType": "ORDER_CREATED",
            "version": "1",
            "metadata": { "source": "orders" }
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }

    #[test]
    fn test_validate_envelope_fields_empty_event_type() {
        let envelope = json!({
            "eventId": "550e8400-e29b-41d4-a716-446655440000",
            "eventType": "",
            "version": "1",
            "metadata": { "source": "orders" }
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }
}
