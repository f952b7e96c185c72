use crate::error::InvoiceError;
use crate::models::UploadInvoiceRequest;

/// Upload size ceiling: 10 MiB
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Validate an upload command before the file is written anywhere.
pub fn validate_upload(req: &UploadInvoiceRequest, file: &[u8]) -> Result<(), InvoiceError> {
    if req.order_id.trim().is_empty() {
        return Err(InvoiceError::Validation("orderId is required".to_string()));
    }
    if req.seller_id.trim().is_empty() {
        return Err(InvoiceError::Validation("sellerId is required".to_string()));
    }
    if file.is_empty() {
        return Err(InvoiceError::Validation(
            "invoice file is required".to_string(),
        ));
    }
    if file.len() > MAX_UPLOAD_BYTES {
        return Err(InvoiceError::Validation(
            "file size must not exceed 10MB".to_string(),
        ));
    }
    if !file.starts_with(PDF_MAGIC) {
        return Err(InvoiceError::Validation(
            "file must be a PDF document".to_string(),
        ));
    }
    Ok(())
}
