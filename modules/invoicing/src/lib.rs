pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod models;
pub mod routes;
pub mod service;
pub mod storage;
pub mod store;
pub mod validation;

pub use error::InvoiceError;
pub use events::consumer::start_invoice_send_consumer;
pub use models::{Invoice, UploadInvoiceRequest};
pub use service::InvoiceService;
