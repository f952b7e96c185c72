//! Gateway glue: request forwarding, upstream-failure mapping, and the
//! aggregated health probe.

use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_rs::routes::{gateway_router, GatewayState};
use gateway_rs::Config;
use serde_json::{json, Value};
use std::sync::Arc;

/// Serve a router on an ephemeral port and return its base URL.
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn fake_orders_service() -> Router {
    Router::new()
        .route(
            "/api/health",
            get(|| async { Json(json!({"status": "healthy", "service": "orders-rs"})) }),
        )
        .route(
            "/api/orders",
            post(|Json(body): Json<Value>| async move {
                (
                    axum::http::StatusCode::CREATED,
                    Json(json!({"data": {"echo": body}})),
                )
            }),
        )
}

async fn spawn_gateway(orders_base_url: String, invoicing_base_url: String) -> String {
    let state = Arc::new(GatewayState::new(Config {
        orders_base_url,
        invoicing_base_url,
        host: "127.0.0.1".to_string(),
        port: 0,
    }));
    spawn_server(gateway_router(state)).await
}

#[tokio::test]
async fn test_forwarding_passes_status_and_body_through() {
    let orders = spawn_server(fake_orders_service()).await;
    // Invoicing intentionally unreachable
    let gateway = spawn_gateway(orders, "http://127.0.0.1:1".to_string()).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{gateway}/api/orders"))
        .json(&json!({"price": 10.0}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["echo"]["price"], 10.0);
}

#[tokio::test]
async fn test_unreachable_upstream_maps_to_service_unavailable() {
    let gateway = spawn_gateway(
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
    )
    .await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{gateway}/api/orders"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "service_unavailable");
}

#[tokio::test]
async fn test_aggregated_health_degrades_only_the_failed_dependency() {
    let orders = spawn_server(fake_orders_service()).await;
    // Invoicing intentionally unreachable
    let gateway = spawn_gateway(orders, "http://127.0.0.1:1".to_string()).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{gateway}/api/health"))
        .send()
        .await
        .unwrap();

    // The probe as a whole still answers 200 with per-service detail.
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["services"]["orders"]["status"], "healthy");
    assert_eq!(body["services"]["invoicing"]["status"], "unhealthy");
    assert!(body["services"]["invoicing"]["error"].is_string());
}

#[tokio::test]
async fn test_gateway_self_probe() {
    let gateway = spawn_gateway(
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
    )
    .await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{gateway}/api/health/gateway"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "gateway-rs");
}
