use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An invoice record. The invoicing service is the sole writer of every
/// field; `sent_at` transitions unset→set at most once, driven by the
/// INVOICE_SEND handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub order_id: String,
    pub seller_id: String,
    pub pdf_path: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Upload command fields (the PDF bytes travel separately as the multipart
/// `file` part)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInvoiceRequest {
    pub order_id: String,
    pub seller_id: String,
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
