//! PDF file storage (external collaborator: plain filesystem writes).
//!
//! Files land under `{root}/{seller_id}/{order_id}/{timestamp}-{filename}`
//! so one order's uploads never collide across sellers or with each other.

use chrono::Utc;
use std::path::Path;

/// Write the invoice PDF and return its stored path.
///
/// The client-supplied filename is flattened to a single path component so
/// it cannot escape the upload root.
pub async fn store_invoice_pdf(
    root: &Path,
    seller_id: &str,
    order_id: &str,
    filename: &str,
    bytes: &[u8],
) -> std::io::Result<String> {
    let dir = root.join(seller_id).join(order_id);
    tokio::fs::create_dir_all(&dir).await?;

    let safe_name = sanitize_filename(filename);
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let path = dir.join(format!("{timestamp}-{safe_name}"));

    tokio::fs::write(&path, bytes).await?;

    Ok(path.to_string_lossy().into_owned())
}

fn sanitize_filename(filename: &str) -> String {
    let flattened: String = filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    if flattened.trim().is_empty() || flattened == "." || flattened == ".." {
        "invoice.pdf".to_string()
    } else {
        flattened
    }
}
