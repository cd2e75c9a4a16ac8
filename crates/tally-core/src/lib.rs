//! # tally-core: Pure Business Logic for the Tally Back Office
//!
//! This crate contains the arithmetic and rules behind order placement as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Tally Back Office Architecture                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Routing / Controller Layer (external)              │   │
//! │  │     parameter validation, status codes, authentication          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ PlaceOrderRequest                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   order   │  │   stock   │  │  loyalty  │  │   │
//! │  │   │  Product  │  │  totals   │  │  floor    │  │  accrual  │  │   │
//! │  │   │  Order    │  │  request  │  │  policy   │  │  policy   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Ledger Store)                      │   │
//! │  │        SQLite, repositories, Order Commit Coordinator           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Order, LineItemDetail)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`order`] - Order placement request and total computation
//! - [`stock`] - Stock floor policy used by the Stock Adjuster
//! - [`loyalty`] - Loyalty Accrual Calculator
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::order::{OrderItemInput, PlaceOrderRequest};
//!
//! let request = PlaceOrderRequest::new(vec![OrderItemInput::new("p-1", 3, 500)]);
//! let prepared = request.prepare().unwrap();
//! assert_eq!(prepared.total.cents(), 1500);
//! assert_eq!(prepared.payment_method, "Cash");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod loyalty;
pub mod money;
pub mod order;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use loyalty::{LoyaltyAccrual, LoyaltyState, RedemptionPolicy};
pub use money::Money;
pub use order::{CustomerAccrual, OrderItemInput, PlaceOrderRequest, PreparedOrder};
pub use stock::{StockLevel, StockPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Payment method recorded when the caller does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "Cash";

/// Maximum line items accepted in a single order.
///
/// ## Business Reason
/// Keeps a single unit of work (and the write lock it holds) short.
pub const MAX_ORDER_ITEMS: usize = 500;

/// Maximum length of a payment method tag.
pub const MAX_PAYMENT_METHOD_LEN: usize = 50;
