use event_bus::retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusError, EventBus, EventEnvelope};
use platform_contracts::{EventType, EVENT_SCHEMA_VERSION};
use serde::Serialize;

/// Service name stamped into `metadata.source` of every envelope we produce
pub const SOURCE_MODULE: &str = "orders";

/// Wrap a payload in the canonical envelope and publish it with bounded
/// retry. The envelope is serialized once, so every retry carries the same
/// eventId — re-emission reuses context instead of minting a fresh id that
/// would defeat consumer dedup.
///
/// Failure is returned only after the retry budget is exhausted.
pub async fn publish_event<T: Serialize>(
    bus: &dyn EventBus,
    retry: &RetryConfig,
    event_type: EventType,
    payload: T,
    correlation_id: Option<String>,
) -> Result<(), BusError> {
    let envelope = EventEnvelope::new(
        event_type.as_str(),
        EVENT_SCHEMA_VERSION,
        SOURCE_MODULE,
        payload,
    )
    .with_correlation_id(correlation_id);

    let bytes =
        serde_json::to_vec(&envelope).map_err(|e| BusError::SerializationError(e.to_string()))?;

    let subject = event_type.subject();
    retry_with_backoff(
        || {
            let bytes = bytes.clone();
            async move { bus.publish(subject, bytes).await }
        },
        retry,
        subject,
    )
    .await?;

    tracing::info!(
        event_id = %envelope.event_id,
        event_type = %event_type,
        subject = %subject,
        "Event published"
    );

    Ok(())
}
