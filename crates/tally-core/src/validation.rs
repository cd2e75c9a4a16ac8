//! # Validation Module
//!
//! Field validation run before any unit of work opens.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Controller (external)                                        │
//! │  └── Parameter shape, authentication                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Quantities, prices, identifiers, payment tags                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger Store (SQLite)                                        │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign keys (unknown product or customer)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Existence of referenced products and customers is NOT checked here; the
//! store reports it from inside the unit of work.

use crate::error::{CoreResult, ValidationError};
use crate::order::OrderItemInput;
use crate::MAX_PAYMENT_METHOD_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_ID_LEN: usize = 64;
const MAX_SKU_LEN: usize = 50;
const MAX_NAME_LEN: usize = 200;
const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a caller-supplied entity identifier (product or customer id).
///
/// ```rust
/// use tally_core::validation::validate_entity_id;
///
/// assert!(validate_entity_id("product_id", "p-1").is_ok());
/// assert!(validate_entity_id("product_id", "  ").is_err());
/// ```
pub fn validate_entity_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }
    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_name("customer name", name)
}

/// Validates a search query and returns it trimmed. Empty is allowed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Validates a non-blank payment method tag.
pub fn validate_payment_method(method: &str) -> ValidationResult<()> {
    if method.trim().is_empty() {
        return Err(ValidationError::required("payment_method"));
    }
    if method.len() > MAX_PAYMENT_METHOD_LEN {
        return Err(ValidationError::TooLong {
            field: "payment_method".to_string(),
            max: MAX_PAYMENT_METHOD_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity. Any positive quantity is accepted; bulk
/// lines are bounded only by the overflow checks on the order total.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::positive("quantity"));
    }
    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ```rust
/// use tally_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::non_negative("unit_price_cents"));
    }
    Ok(())
}

/// Validates a loyalty point amount (balance, redeemed or earned).
pub fn validate_points(field: &str, points: i64) -> ValidationResult<()> {
    if points < 0 {
        return Err(ValidationError::non_negative(field));
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates one submitted order line.
pub fn validate_order_item(item: &OrderItemInput) -> CoreResult<()> {
    validate_entity_id("product_id", &item.product_id)?;
    validate_quantity(item.quantity)?;
    validate_price_cents(item.unit_price_cents)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_product_name("Espresso Beans 1kg").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_customer_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(i64::MAX).is_ok());

        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn test_validate_order_item() {
        assert!(validate_order_item(&OrderItemInput::new("p-1", 2, 0)).is_ok());
        assert!(validate_order_item(&OrderItemInput::new("", 2, 100)).is_err());
        assert!(validate_order_item(&OrderItemInput::new("p-1", 2, -1)).is_err());
        assert!(matches!(
            validate_order_item(&OrderItemInput::new("p-1", 0, 100)),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
    }

    #[test]
    fn test_validate_payment_method() {
        assert!(validate_payment_method("Card").is_ok());
        assert!(validate_payment_method(" ").is_err());
        assert!(validate_payment_method(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_search_query_trims() {
        assert_eq!(validate_search_query("  beans ").unwrap(), "beans");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_points() {
        assert!(validate_points("points", 0).is_ok());
        assert!(validate_points("points", -5).is_err());
    }
}
