use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::InvoiceError;
use crate::health::health;
use crate::models::{ErrorResponse, UploadInvoiceRequest};
use crate::service::InvoiceService;
use crate::validation::MAX_UPLOAD_BYTES;

pub fn invoicing_router(service: Arc<InvoiceService>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/invoices", post(upload_invoice))
        .route("/api/invoices/{id}", get(get_invoice))
        .route("/api/invoices/order/{order_id}", get(get_invoice_by_order))
        // Default axum body limit is 2MB; uploads go up to the 10MB ceiling
        // plus multipart framing overhead.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
        .with_state(service)
}

fn error_response(err: InvoiceError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        InvoiceError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("validation_error", msg)),
        ),
        InvoiceError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("not_found", format!("{what} not found"))),
        ),
        InvoiceError::Store(e) => {
            tracing::error!(error = %e, "Store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("store_error", "invoice store failure")),
            )
        }
        InvoiceError::Storage(e) => {
            tracing::error!(error = %e, "File storage error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "storage_error",
                    "invoice file could not be stored",
                )),
            )
        }
        InvoiceError::Transport(e) => {
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

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("validation_error", message)),
    )
}

/// POST /api/invoices — multipart form with `file`, `orderId`, `sellerId`
async fn upload_invoice(
    State(service): State<Arc<InvoiceService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<ErrorResponse>)> {
    let mut order_id = String::new();
    let mut seller_id = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart request: {e}")))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("orderId") => {
                order_id = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("invalid orderId field: {e}")))?;
            }
            Some("sellerId") => {
                seller_id = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("invalid sellerId field: {e}")))?;
            }
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("invoice.pdf")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("invalid file field: {e}")))?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| bad_request("invoice file is required"))?;

    let invoice = service
        .upload(
            UploadInvoiceRequest {
                order_id,
                seller_id,
            },
            bytes,
            &filename,
        )
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(json!({ "data": invoice }))))
}

/// GET /api/invoices/{id}
async fn get_invoice(
    State(service): State<Arc<InvoiceService>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let invoice = service.get_by_id(&id).await.map_err(error_response)?;
    Ok(Json(json!({ "data": invoice })))
}

/// GET /api/invoices/order/{order_id}
async fn get_invoice_by_order(
    State(service): State<Arc<InvoiceService>>,
    Path(order_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let invoice = service
        .get_by_order_id(&order_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "data": invoice })))
}
