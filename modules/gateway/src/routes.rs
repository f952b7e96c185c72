//! Reverse-proxy glue: each handler forwards the request body and
//! content-type to the owning service and passes the upstream response back
//! verbatim. A service that cannot be reached maps to 503, not to a gateway
//! crash.

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::health::{aggregated_health, gateway_health};

// 10MB invoice ceiling plus multipart framing overhead
const MAX_PROXY_BODY_BYTES: usize = 11 * 1024 * 1024;

#[derive(Clone)]
pub struct GatewayState {
    pub client: reqwest::Client,
    pub config: Config,
}

impl GatewayState {
    pub fn new(config: Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }
}

pub fn gateway_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/api/health", get(aggregated_health))
        .route("/api/health/gateway", get(gateway_health))
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{id}", get(get_order).put(update_order))
        .route("/api/invoices", post(upload_invoice))
        .route("/api/invoices/{id}", get(get_invoice))
        .route("/api/invoices/order/{order_id}", get(get_invoice_by_order))
        .layer(DefaultBodyLimit::max(MAX_PROXY_BODY_BYTES))
        .with_state(state)
}

enum Upstream {
    Orders,
    Invoicing,
}

impl Upstream {
    fn base<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            Upstream::Orders => &config.orders_base_url,
            Upstream::Invoicing => &config.invoicing_base_url,
        }
    }

    const fn unavailable_message(&self) -> &'static str {
        match self {
            Upstream::Orders => "Order service unavailable",
            Upstream::Invoicing => "Invoice service unavailable",
        }
    }
}

/// Forward a request upstream and mirror the response back.
async fn forward(
    state: &GatewayState,
    upstream: Upstream,
    method: reqwest::Method,
    path: &str,
    headers: &HeaderMap,
    body: Option<Bytes>,
) -> Response {
    let url = format!("{}{}", upstream.base(&state.config), path);

    let mut request = state.client.request(method, &url);
    if let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    {
        request = request.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(body) = body {
        request = request.body(body);
    }

    match request.send().await {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json")
                .to_string();
            let bytes = response.bytes().await.unwrap_or_default();

            Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(bytes))
                .unwrap_or_else(|_| service_unavailable(upstream.unavailable_message()))
        }
        Err(e) => {
            tracing::error!(url = %url, error = %e, "Upstream request failed");
            service_unavailable(upstream.unavailable_message())
        }
    }
}

fn service_unavailable(message: &str) -> Response {
    let body = serde_json::json!({
        "error": "service_unavailable",
        "message": message
    });
    Response::builder()
        .status(StatusCode::SERVICE_UNAVAILABLE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("static response must build")
}

/// POST /api/orders
async fn create_order(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward(
        &state,
        Upstream::Orders,
        reqwest::Method::POST,
        "/api/orders",
        &headers,
        Some(body),
    )
    .await
}

/// GET /api/orders
async fn list_orders(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    forward(
        &state,
        Upstream::Orders,
        reqwest::Method::GET,
        "/api/orders",
        &headers,
        None,
    )
    .await
}

/// GET /api/orders/{id}
async fn get_order(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    forward(
        &state,
        Upstream::Orders,
        reqwest::Method::GET,
        &format!("/api/orders/{id}"),
        &headers,
        None,
    )
    .await
}

/// PUT /api/orders/{id}
async fn update_order(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward(
        &state,
        Upstream::Orders,
        reqwest::Method::PUT,
        &format!("/api/orders/{id}"),
        &headers,
        Some(body),
    )
    .await
}

/// POST /api/invoices — the multipart body streams through untouched; the
/// boundary lives in the content-type header, which is forwarded with it.
async fn upload_invoice(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    forward(
        &state,
        Upstream::Invoicing,
        reqwest::Method::POST,
        "/api/invoices",
        &headers,
        Some(body),
    )
    .await
}

/// GET /api/invoices/{id}
async fn get_invoice(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    forward(
        &state,
        Upstream::Invoicing,
        reqwest::Method::GET,
        &format!("/api/invoices/{id}"),
        &headers,
        None,
    )
    .await
}

/// GET /api/invoices/order/{order_id}
async fn get_invoice_by_order(
    State(state): State<Arc<GatewayState>>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    forward(
        &state,
        Upstream::Invoicing,
        reqwest::Method::GET,
        &format!("/api/invoices/order/{order_id}"),
        &headers,
        None,
    )
    .await
}
