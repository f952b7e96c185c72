//! # Platform Contracts
//!
//! The shared event catalog for the order/invoice choreography. Every
//! producer and consumer in the workspace speaks exactly this closed set of
//! event types; a tag outside the catalog is a contract violation that
//! consumers log and quarantine rather than silently ignore.
//!
//! | eventType        | Subject                             | Producer  | Consumer  |
//! |------------------|-------------------------------------|-----------|-----------|
//! | ORDER_CREATED    | orders.events.order.created         | orders    | (reserved)|
//! | INVOICE_UPLOADED | invoicing.events.invoice.uploaded   | invoicing | orders    |
//! | INVOICE_SEND     | orders.events.invoice.send          | orders    | invoicing |
//! | INVOICE_SENT     | invoicing.events.invoice.sent       | invoicing | (reserved)|

mod events;

pub use events::{
    ChoreographyEvent, ContractError, EventType, InvoiceSendPayload, InvoiceSentPayload,
    InvoiceUploadedPayload, OrderCreatedPayload, EVENT_SCHEMA_VERSION,
};
