pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod validation;

pub use error::OrderError;
pub use events::consumer::start_invoice_uploaded_consumer;
pub use models::{CreateOrderRequest, Order, OrderStatus, UpdateOrderRequest};
pub use service::OrderService;
