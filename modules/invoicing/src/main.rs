use event_bus::{EventBus, InMemoryBus, NatsBus};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use invoicing_rs::config::Config;
use invoicing_rs::routes::invoicing_router;
use invoicing_rs::service::InvoiceService;
use invoicing_rs::{start_invoice_send_consumer, store};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting invoicing service...");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    // Record store (fatal on connect/migrate failure)
    let store = store::connect(&config)
        .await
        .expect("Failed to initialize invoice store");

    // Process-wide transport session: connect once, before serving traffic.
    let bus: Arc<dyn EventBus> = match config.bus_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
        "nats" => Arc::new(
            NatsBus::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS"),
        ),
        _ => panic!(
            "Invalid BUS_TYPE: {}. Must be 'inmemory' or 'nats'",
            config.bus_type
        ),
    };

    let service = Arc::new(InvoiceService::new(
        store,
        bus.clone(),
        config.upload_dir.clone(),
    ));

    // Subscribe before accepting commands so no send request is missed.
    start_invoice_send_consumer(bus.clone(), service.clone())
        .await
        .expect("Failed to subscribe to invoice send events");

    let app = invoicing_router(service).layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT");
    tracing::info!("Invoicing service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");

    // Drain in-flight publishes, then release the session.
    if let Err(e) = bus.disconnect().await {
        tracing::warn!(error = %e, "Event bus disconnect failed");
    }
    tracing::info!("Invoicing service stopped");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
