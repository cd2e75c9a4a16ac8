//! # Domain Types
//!
//! Core domain types used throughout the back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │   Customer      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku            │   │  customer_id?   │◄──│  loyalty_points │       │
//! │  │  price_cents    │   │  total_cents    │   │  total_spend    │       │
//! │  │  current_stock  │   │  status         │   │  total_purchases│       │
//! │  └────────▲────────┘   └────────▲────────┘   └─────────────────┘       │
//! │           │                     │                                       │
//! │           │            ┌────────┴────────┐                              │
//! │           └────────────│ LineItemDetail  │                              │
//! │                        │  quantity       │                              │
//! │                        │  unit_price     │ (captured at sale time)      │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::order::OrderItemInput;
use uuid::Uuid;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Current list price in cents. Orders capture their own unit price,
    /// so changing this never rewrites history.
    pub price_cents: i64,

    /// Cost in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Whether stock is managed for this product. Unmanaged products are
    /// never rejected by the stock floor.
    pub track_inventory: bool,

    /// Allow selling below the stock floor.
    pub allow_negative_stock: bool,

    /// Current stock level.
    pub current_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A new active, inventory-tracked product with zero stock.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.into(),
            name: name.into(),
            price_cents,
            cost_cents: None,
            track_inventory: true,
            allow_negative_stock: false,
            current_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.current_stock = stock;
        self
    }

    /// Stops tracking inventory; the stock floor no longer applies.
    pub fn unmanaged(mut self) -> Self {
        self.track_inventory = false;
        self
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer enrolled in the loyalty program.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,

    /// Loyalty point balance. Never negative once committed.
    pub loyalty_points: i64,

    /// Lifetime spend in cents.
    pub total_spend_cents: i64,

    /// Lifetime number of completed orders.
    pub total_purchases: i64,

    /// Last time an order was placed for this customer.
    #[ts(as = "Option<String>")]
    pub last_visit: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Customer {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            phone: None,
            email: None,
            loyalty_points: 0,
            total_spend_cents: 0,
            total_purchases: 0,
            last_visit: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_points(mut self, points: i64) -> Self {
        self.loyalty_points = points;
        self
    }

    #[inline]
    pub fn total_spend(&self) -> Money {
        Money::from_cents(self.total_spend_cents)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// Orders are created `Completed`. `Cancelled` is reached only through an
/// explicit status transition outside the commit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown order status '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A completed (or cancelled) sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: Option<String>,
    pub total_cents: i64,
    pub payment_method: String,
    pub status: OrderStatus,

    /// Denormalized copy of the submitted line items, kept for cheap
    /// read-back and export. `order_items` stays the source of truth.
    pub items: Vec<OrderItemInput>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An order joined with its customer's display name, as listed in the
/// order history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    pub order: Order,
    pub customer_name: Option<String>,
}

// =============================================================================
// Order Line Item
// =============================================================================

/// One product quantity within an order, joined with the product's current
/// name.
///
/// `unit_price_cents` is frozen at sale time so later price changes never
/// alter historical orders.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItemDetail {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Units handed back through the returns workflow.
    pub returned_quantity: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_is_managed() {
        let product = Product::new("BEANS-1KG", "Espresso Beans", 1800).with_stock(2);
        assert!(product.track_inventory);
        assert!(!product.allow_negative_stock);
        assert_eq!(product.current_stock, 2);
        assert!(!product.unmanaged().track_inventory);
    }

    #[test]
    fn test_order_status_default_is_completed() {
        assert_eq!(OrderStatus::default(), OrderStatus::Completed);
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("Cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
