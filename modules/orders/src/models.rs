use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Accepted,
    Rejected,
    Shipping,
    Shipped,
}

impl OrderStatus {
    /// Wire/store representation (matches the serde tag)
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Shipped => "SHIPPED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(OrderStatus::Created),
            "ACCEPTED" => Some(OrderStatus::Accepted),
            "REJECTED" => Some(OrderStatus::Rejected),
            "SHIPPING" => Some(OrderStatus::Shipping),
            "SHIPPED" => Some(OrderStatus::Shipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order record. The orders service is the sole writer of every field
/// here, including `invoice_id` (set at most once by the INVOICE_UPLOADED
/// handler) and `invoice_send_emitted` (the persisted claim flag that makes
/// INVOICE_SEND exactly-once under concurrent triggers).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub price: f64,
    pub quantity: i32,
    pub product_id: String,
    pub customer_id: String,
    pub seller_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub invoice_send_emitted: bool,
    pub created_at: DateTime<Utc>,
}

/// POST /api/orders request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub price: f64,
    pub quantity: i64,
    pub product_id: String,
    pub customer_id: String,
    pub seller_id: String,
}

/// PUT /api/orders/{id} request body — all fields optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub product_id: Option<String>,
    pub customer_id: Option<String>,
    pub seller_id: Option<String>,
}

/// Standard error body returned by the HTTP surface
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }
}
