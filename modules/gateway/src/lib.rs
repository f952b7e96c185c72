pub mod config;
pub mod health;
pub mod routes;

pub use config::Config;
pub use routes::{gateway_router, GatewayState};
