use crate::service::OrderService;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use std::sync::Arc;

/// Health check endpoint handler.
///
/// Reports degraded (503) when the record store is unreachable so the
/// gateway's aggregated probe sees the dependency failure.
pub async fn health(State(service): State<Arc<OrderService>>) -> (StatusCode, Json<Value>) {
    match service.store_healthy().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": "orders-rs",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "degraded",
                "service": "orders-rs",
                "version": env!("CARGO_PKG_VERSION"),
                "error": e.to_string()
            })),
        ),
    }
}
