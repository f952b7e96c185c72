use crate::error::OrderError;
use crate::models::{CreateOrderRequest, UpdateOrderRequest};

fn require_positive_price(price: f64) -> Result<(), OrderError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(OrderError::Validation(
            "price must be a positive number".to_string(),
        ));
    }
    Ok(())
}

fn require_positive_quantity(quantity: i64) -> Result<(), OrderError> {
    if quantity <= 0 || quantity > i64::from(i32::MAX) {
        return Err(OrderError::Validation(
            "quantity must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn require_non_empty(value: &str, field: &str) -> Result<(), OrderError> {
    if value.trim().is_empty() {
        return Err(OrderError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Validate a create command before any mutation or publish happens.
pub fn validate_create(req: &CreateOrderRequest) -> Result<(), OrderError> {
    require_positive_price(req.price)?;
    require_positive_quantity(req.quantity)?;
    require_non_empty(&req.product_id, "productId")?;
    require_non_empty(&req.customer_id, "customerId")?;
    require_non_empty(&req.seller_id, "sellerId")?;
    Ok(())
}

/// Validate the fields present in an update patch.
pub fn validate_patch(patch: &UpdateOrderRequest) -> Result<(), OrderError> {
    if let Some(price) = patch.price {
        require_positive_price(price)?;
    }
    if let Some(quantity) = patch.quantity {
        require_positive_quantity(quantity)?;
    }
    if let Some(product_id) = &patch.product_id {
        require_non_empty(product_id, "productId")?;
    }
    if let Some(customer_id) = &patch.customer_id {
        require_non_empty(customer_id, "customerId")?;
    }
    if let Some(seller_id) = &patch.seller_id {
        require_non_empty(seller_id, "sellerId")?;
    }
    Ok(())
}
