//! # Order Placement Request
//!
//! The payload a caller submits to place an order, and the pure
//! preparation step that runs before any unit of work is opened.
//!
//! ## Preparation
//! ```text
//! PlaceOrderRequest
//!      │
//!      ▼
//! prepare()  ← validation + total computation, no I/O
//!      │
//!      ├── total: explicit total, else Σ unit_price × quantity, else 0
//!      ├── payment method: trimmed, else the default ("Cash")
//!      └── accrual: only when a customer is attached
//!      │
//!      ▼
//! PreparedOrder → handed to the Order Commit Coordinator
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::loyalty::LoyaltyAccrual;
use crate::money::Money;
use crate::validation::{validate_entity_id, validate_order_item, validate_payment_method};
use crate::{DEFAULT_PAYMENT_METHOD, MAX_ORDER_ITEMS};

// =============================================================================
// Order Item Input
// =============================================================================

/// One submitted line: which product, how many, at what unit price.
///
/// The unit price is supplied by the caller and captured as-is; it is not
/// looked up from the product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderItemInput {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        OrderItemInput {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// `unit_price × quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_times(self.quantity)
    }
}

// =============================================================================
// Place Order Request
// =============================================================================

/// A structured order placement request.
///
/// Everything except `items` is optional. An empty item list is a valid
/// order (it totals to the explicit total, or zero).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub customer_id: Option<String>,

    #[serde(default)]
    pub items: Vec<OrderItemInput>,

    #[serde(default)]
    pub payment_method: Option<String>,

    /// Explicit total in cents. Wins over the computed sum when present.
    #[serde(default)]
    pub total_cents: Option<i64>,

    #[serde(default)]
    pub points_redeemed: Option<i64>,

    #[serde(default)]
    pub points_earned: Option<i64>,
}

impl PlaceOrderRequest {
    pub fn new(items: Vec<OrderItemInput>) -> Self {
        PlaceOrderRequest {
            items,
            ..Default::default()
        }
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn with_total_cents(mut self, total_cents: i64) -> Self {
        self.total_cents = Some(total_cents);
        self
    }

    pub fn with_points(mut self, redeemed: i64, earned: i64) -> Self {
        self.points_redeemed = Some(redeemed);
        self.points_earned = Some(earned);
        self
    }

    /// Computes the order total.
    ///
    /// Explicit total if provided; otherwise the sum of line totals
    /// (zero for an empty order).
    ///
    /// ```rust
    /// use tally_core::order::{OrderItemInput, PlaceOrderRequest};
    ///
    /// let computed = PlaceOrderRequest::new(vec![
    ///     OrderItemInput::new("p-1", 3, 500),
    ///     OrderItemInput::new("p-2", 1, 99),
    /// ]);
    /// assert_eq!(computed.compute_total().unwrap().cents(), 1599);
    ///
    /// let explicit = computed.clone().with_total_cents(1000);
    /// assert_eq!(explicit.compute_total().unwrap().cents(), 1000);
    /// ```
    pub fn compute_total(&self) -> CoreResult<Money> {
        if let Some(explicit) = self.total_cents {
            return Ok(Money::from_cents(explicit));
        }

        self.items.iter().try_fold(Money::zero(), |acc, item| {
            item.line_total()
                .and_then(|line| acc.checked_add(line))
                .ok_or_else(|| CoreError::AmountOverflow {
                    context: "order total".to_string(),
                })
        })
    }

    /// Validates the request and computes everything the commit needs.
    pub fn prepare(&self) -> CoreResult<PreparedOrder> {
        self.prepare_with_default_method(DEFAULT_PAYMENT_METHOD)
    }

    /// Like [`prepare`](Self::prepare), recording `default_method` when the
    /// request names no payment method.
    pub fn prepare_with_default_method(&self, default_method: &str) -> CoreResult<PreparedOrder> {
        if self.items.len() > MAX_ORDER_ITEMS {
            return Err(CoreError::OrderTooLarge {
                max: MAX_ORDER_ITEMS,
            });
        }
        for item in &self.items {
            validate_order_item(item)?;
        }

        if let Some(explicit) = self.total_cents {
            if explicit < 0 {
                return Err(ValidationError::non_negative("total_cents").into());
            }
        }
        let total = self.compute_total()?;

        let payment_method = match self.payment_method.as_deref().map(str::trim) {
            Some(method) if !method.is_empty() => {
                validate_payment_method(method)?;
                method.to_string()
            }
            _ => default_method.to_string(),
        };

        let accrual = match &self.customer_id {
            Some(customer_id) => {
                validate_entity_id("customer_id", customer_id)?;
                let accrual = LoyaltyAccrual::new(
                    self.points_redeemed.unwrap_or(0),
                    self.points_earned.unwrap_or(0),
                    total,
                )?;
                Some(CustomerAccrual {
                    customer_id: customer_id.clone(),
                    accrual,
                })
            }
            None => None,
        };

        Ok(PreparedOrder {
            total,
            payment_method,
            items: self.items.clone(),
            accrual,
        })
    }
}

// =============================================================================
// Prepared Order
// =============================================================================

/// A validated request with its total computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedOrder {
    pub total: Money,
    pub payment_method: String,
    pub items: Vec<OrderItemInput>,
    pub accrual: Option<CustomerAccrual>,
}

impl PreparedOrder {
    pub fn customer_id(&self) -> Option<&str> {
        self.accrual.as_ref().map(|a| a.customer_id.as_str())
    }
}

/// Loyalty side effect bound to the customer it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerAccrual {
    pub customer_id: String,
    pub accrual: LoyaltyAccrual,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_order_totals_zero() {
        let prepared = PlaceOrderRequest::new(vec![]).prepare().unwrap();
        assert_eq!(prepared.total, Money::zero());
        assert!(prepared.items.is_empty());
        assert_eq!(prepared.payment_method, "Cash");
        assert!(prepared.accrual.is_none());
    }

    #[test]
    fn test_empty_order_with_explicit_total() {
        let prepared = PlaceOrderRequest::new(vec![])
            .with_total_cents(0)
            .prepare()
            .unwrap();
        assert_eq!(prepared.total.cents(), 0);
    }

    #[test]
    fn test_computed_total() {
        let prepared = PlaceOrderRequest::new(vec![OrderItemInput::new("p", 3, 500)])
            .prepare()
            .unwrap();
        assert_eq!(prepared.total.cents(), 1500);
    }

    #[test]
    fn test_explicit_total_wins() {
        let prepared = PlaceOrderRequest::new(vec![OrderItemInput::new("p", 3, 500)])
            .with_total_cents(1200)
            .prepare()
            .unwrap();
        assert_eq!(prepared.total.cents(), 1200);
    }

    #[test]
    fn test_negative_explicit_total_rejected() {
        let err = PlaceOrderRequest::new(vec![])
            .with_total_cents(-1)
            .prepare()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        for qty in [0, -2] {
            let err = PlaceOrderRequest::new(vec![OrderItemInput::new("p", qty, 100)])
                .prepare()
                .unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::MustBePositive { .. })
            ));
        }
    }

    #[test]
    fn test_overflowing_total_rejected() {
        let err = PlaceOrderRequest::new(vec![
            OrderItemInput::new("p", 9_000, i64::MAX / 10_000),
            OrderItemInput::new("q", 9_000, i64::MAX / 10_000),
        ])
        .prepare()
        .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
    }

    #[test]
    fn test_payment_method_defaults_and_trims() {
        let blank = PlaceOrderRequest::new(vec![])
            .with_payment_method("   ")
            .prepare()
            .unwrap();
        assert_eq!(blank.payment_method, "Cash");

        let card = PlaceOrderRequest::new(vec![])
            .with_payment_method(" Card ")
            .prepare()
            .unwrap();
        assert_eq!(card.payment_method, "Card");

        let house = PlaceOrderRequest::new(vec![])
            .prepare_with_default_method("Account")
            .unwrap();
        assert_eq!(house.payment_method, "Account");
    }

    #[test]
    fn test_accrual_only_with_customer() {
        let prepared = PlaceOrderRequest::new(vec![OrderItemInput::new("p", 3, 500)])
            .with_customer("c-1")
            .with_points(0, 5)
            .prepare()
            .unwrap();
        assert_eq!(prepared.customer_id(), Some("c-1"));
        let accrual = prepared.accrual.unwrap().accrual;
        assert_eq!(accrual.earned(), 5);
        assert_eq!(accrual.order_total().cents(), 1500);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: PlaceOrderRequest = serde_json::from_str(
            r#"{"items":[{"product_id":"p","quantity":2,"unit_price_cents":250}]}"#,
        )
        .unwrap();
        assert!(req.customer_id.is_none());
        assert_eq!(req.compute_total().unwrap().cents(), 500);
    }
}
