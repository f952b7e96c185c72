use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::OrderError;
use crate::health::health;
use crate::models::{CreateOrderRequest, ErrorResponse, UpdateOrderRequest};
use crate::service::OrderService;

pub fn orders_router(service: Arc<OrderService>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order).put(update_order))
        .with_state(service)
}

fn error_response(err: OrderError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        OrderError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("validation_error", msg)),
        ),
        OrderError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                "not_found",
                format!("order {id} not found"),
            )),
        ),
        OrderError::Store(e) => {
            tracing::error!(error = %e, "Store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("store_error", "order store failure")),
            )
        }
        OrderError::Transport(e) => {
            tracing::error!(error = %e, "Transport error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new(
                    "transport_error",
                    "event publish failed after retries",
                )),
            )
        }
    }
}

/// POST /api/orders
async fn create_order(
    State(service): State<Arc<OrderService>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<ErrorResponse>)> {
    let order = service.create_order(req).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "data": order }))))
}

/// GET /api/orders
async fn list_orders(
    State(service): State<Arc<OrderService>>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let orders = service.list_orders().await.map_err(error_response)?;
    Ok(Json(json!({ "data": orders })))
}

/// GET /api/orders/{id}
async fn get_order(
    State(service): State<Arc<OrderService>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let order = service.get_order(&id).await.map_err(error_response)?;
    Ok(Json(json!({ "data": order })))
}

/// PUT /api/orders/{id}
async fn update_order(
    State(service): State<Arc<OrderService>>,
    Path(id): Path<String>,
    Json(patch): Json<UpdateOrderRequest>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let order = service
        .update_order(&id, patch)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "data": order })))
}
