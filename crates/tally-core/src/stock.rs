//! # Stock Floor Policy
//!
//! Pure decision logic behind the Stock Adjuster.
//!
//! ## How a Decrement Is Judged
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Line item: 3 × P                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Store applies delta:  current_stock = current_stock - 3               │
//! │       │                (inside the order's unit of work)                │
//! │       ▼                                                                 │
//! │  StockPolicy::check_after(post-image, 3)                               │
//! │       │                                                                 │
//! │       ├── unmanaged (track_inventory = false)      → OK                 │
//! │       ├── allow_negative_stock = true              → OK                 │
//! │       ├── post-image >= floor                      → OK                 │
//! │       └── otherwise → InsufficientStock → whole order rolls back       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The delta is applied by the store first and judged afterwards, so two
//! line items for the same product see each other's decrement.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The stock-related fields of one product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: String,
    pub current_stock: i64,
    pub track_inventory: bool,
    pub allow_negative_stock: bool,
}

/// Minimum permitted inventory level for managed products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPolicy {
    pub floor: i64,
}

impl Default for StockPolicy {
    fn default() -> Self {
        StockPolicy { floor: 0 }
    }
}

impl StockPolicy {
    pub const fn with_floor(floor: i64) -> Self {
        StockPolicy { floor }
    }

    /// Whether the floor applies to this product at all.
    #[inline]
    pub fn enforces(&self, level: &StockLevel) -> bool {
        level.track_inventory && !level.allow_negative_stock
    }

    /// Judges a post-decrement image returned by the store.
    ///
    /// `available` in the error is reconstructed as `after + quantity`,
    /// i.e. the level this line item saw.
    ///
    /// ```rust
    /// use tally_core::stock::{StockLevel, StockPolicy};
    ///
    /// let after = StockLevel {
    ///     product_id: "p-1".into(),
    ///     current_stock: 7,
    ///     track_inventory: true,
    ///     allow_negative_stock: false,
    /// };
    /// assert!(StockPolicy::default().check_after(&after, 3).is_ok());
    /// assert!(StockPolicy::with_floor(8).check_after(&after, 3).is_err());
    /// ```
    pub fn check_after(&self, after: &StockLevel, quantity: i64) -> CoreResult<()> {
        if self.enforces(after) && after.current_stock < self.floor {
            return Err(CoreError::InsufficientStock {
                product_id: after.product_id.clone(),
                available: after.current_stock.saturating_add(quantity),
                requested: quantity,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
