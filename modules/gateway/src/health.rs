//! Liveness aggregation: probe each service's health endpoint and report
//! per-service results. One dependency being down degrades its entry, never
//! the whole probe.

use crate::routes::GatewayState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// GET /api/health — aggregated probe over both services
pub async fn aggregated_health(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let orders_url = format!("{}/api/health", state.config.orders_base_url);
    let invoicing_url = format!("{}/api/health", state.config.invoicing_base_url);

    let (orders, invoicing) = tokio::join!(
        probe(&state.client, &orders_url),
        probe(&state.client, &invoicing_url)
    );

    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "services": {
            "orders": orders,
            "invoicing": invoicing,
        }
    }))
}

/// GET /api/health/gateway — the gateway itself
pub async fn gateway_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "gateway-rs",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Probe one service. An unreachable service or a garbage body degrades to
/// an `unhealthy` entry carrying the reason; a reachable service's own
/// health payload (healthy or degraded) passes through as-is.
async fn probe(client: &reqwest::Client, url: &str) -> Value {
    match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => response.json::<Value>().await.unwrap_or_else(|e| {
            json!({
                "status": "unhealthy",
                "error": format!("invalid health payload: {e}")
            })
        }),
        Err(e) => json!({
            "status": "unhealthy",
            "error": e.to_string()
        }),
    }
}
