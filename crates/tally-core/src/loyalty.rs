//! # Loyalty Accrual Calculator
//!
//! Computes a customer's new point balance and lifetime statistics from a
//! completed order.
//!
//! ## Arithmetic
//! ```text
//! points    = max(0, points - redeemed + earned)
//! spend     = spend + order_total
//! purchases = purchases + 1
//! ```
//!
//! ## Over-Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balance 20, redeem 50, earn 5                                          │
//! │                                                                         │
//! │  RedemptionPolicy::Clamp  (default)  → balance 0, order commits         │
//! │  RedemptionPolicy::Reject            → InsufficientPoints, rollback     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// What to do when a redemption exceeds the current balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionPolicy {
    /// Floor the balance at zero and let the order commit.
    #[default]
    Clamp,
    /// Fail the order.
    Reject,
}

impl fmt::Display for RedemptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedemptionPolicy::Clamp => write!(f, "clamp"),
            RedemptionPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for RedemptionPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clamp" => Ok(RedemptionPolicy::Clamp),
            "reject" | "strict" => Ok(RedemptionPolicy::Reject),
            other => Err(ValidationError::InvalidFormat {
                field: "redemption_policy".to_string(),
                reason: format!("unknown policy '{}', expected clamp or reject", other),
            }),
        }
    }
}

/// The loyalty fields of one customer row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LoyaltyState {
    pub loyalty_points: i64,
    pub total_spend_cents: i64,
    pub total_purchases: i64,
}

/// The loyalty side effect of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyAccrual {
    redeemed: i64,
    earned: i64,
    order_total: Money,
}

impl LoyaltyAccrual {
    /// Builds an accrual, rejecting negative point amounts.
    pub fn new(redeemed: i64, earned: i64, order_total: Money) -> CoreResult<Self> {
        if redeemed < 0 {
            return Err(ValidationError::non_negative("points_redeemed").into());
        }
        if earned < 0 {
            return Err(ValidationError::non_negative("points_earned").into());
        }
        Ok(LoyaltyAccrual {
            redeemed,
            earned,
            order_total,
        })
    }

    pub fn redeemed(&self) -> i64 {
        self.redeemed
    }

    pub fn earned(&self) -> i64 {
        self.earned
    }

    pub fn order_total(&self) -> Money {
        self.order_total
    }

    /// Applies this accrual to a customer's current state.
    ///
    /// ```rust
    /// use tally_core::loyalty::{LoyaltyAccrual, LoyaltyState, RedemptionPolicy};
    /// use tally_core::Money;
    ///
    /// let before = LoyaltyState { loyalty_points: 20, total_spend_cents: 0, total_purchases: 0 };
    /// let accrual = LoyaltyAccrual::new(0, 5, Money::from_cents(1500)).unwrap();
    /// let after = accrual.apply("c-1", &before, RedemptionPolicy::Clamp).unwrap();
    ///
    /// assert_eq!(after.loyalty_points, 25);
    /// assert_eq!(after.total_spend_cents, 1500);
    /// assert_eq!(after.total_purchases, 1);
    /// ```
    pub fn apply(
        &self,
        customer_id: &str,
        before: &LoyaltyState,
        policy: RedemptionPolicy,
    ) -> CoreResult<LoyaltyState> {
        if policy == RedemptionPolicy::Reject && self.redeemed > before.loyalty_points {
            return Err(CoreError::InsufficientPoints {
                customer_id: customer_id.to_string(),
                balance: before.loyalty_points,
                requested: self.redeemed,
            });
        }

        let overflow = |what: &str| CoreError::AmountOverflow {
            context: format!("{} of customer {}", what, customer_id),
        };

        let points = before
            .loyalty_points
            .checked_sub(self.redeemed)
            .and_then(|p| p.checked_add(self.earned))
            .ok_or_else(|| overflow("loyalty points"))?
            .max(0);

        let spend = before
            .total_spend_cents
            .checked_add(self.order_total.cents())
            .ok_or_else(|| overflow("total spend"))?;

        let purchases = before
            .total_purchases
            .checked_add(1)
            .ok_or_else(|| overflow("purchase count"))?;

        Ok(LoyaltyState {
            loyalty_points: points,
            total_spend_cents: spend,
            total_purchases: purchases,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state(points: i64) -> LoyaltyState {
        LoyaltyState {
            loyalty_points: points,
            total_spend_cents: 10_000,
            total_purchases: 4,
        }
    }

    #[test]
    fn test_earn_and_redeem() {
        let accrual = LoyaltyAccrual::new(10, 3, Money::from_cents(250)).unwrap();
        let after = accrual.apply("c-1", &state(20), RedemptionPolicy::Clamp).unwrap();
        assert_eq!(after.loyalty_points, 13);
        assert_eq!(after.total_spend_cents, 10_250);
        assert_eq!(after.total_purchases, 5);
    }

    #[test]
    fn test_balance_formula_matches_clamp() {
        for (b, r, e) in [(20, 0, 5), (20, 50, 5), (0, 0, 0), (7, 7, 0), (3, 10, 6)] {
            let accrual = LoyaltyAccrual::new(r, e, Money::zero()).unwrap();
            let after = accrual.apply("c-1", &state(b), RedemptionPolicy::Clamp).unwrap();
            assert_eq!(after.loyalty_points, (b - r + e).max(0), "b={b} r={r} e={e}");
        }
    }

    #[test]
    fn test_over_redemption_clamps_to_zero() {
        let accrual = LoyaltyAccrual::new(50, 5, Money::from_cents(100)).unwrap();
        let after = accrual.apply("c-1", &state(20), RedemptionPolicy::Clamp).unwrap();
        assert_eq!(after.loyalty_points, 0);
        assert_eq!(after.total_purchases, 5);
    }

    #[test]
    fn test_over_redemption_rejected_under_strict_policy() {
        let accrual = LoyaltyAccrual::new(50, 5, Money::from_cents(100)).unwrap();
        let err = accrual
            .apply("c-1", &state(20), RedemptionPolicy::Reject)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientPoints { balance: 20, requested: 50, .. }
        ));

        // Redeeming exactly the balance is fine.
        let exact = LoyaltyAccrual::new(20, 0, Money::zero()).unwrap();
        assert_eq!(
            exact
                .apply("c-1", &state(20), RedemptionPolicy::Reject)
                .unwrap()
                .loyalty_points,
            0
        );
    }

    #[test]
    fn test_negative_points_rejected() {
        assert!(LoyaltyAccrual::new(-1, 0, Money::zero()).is_err());
        assert!(LoyaltyAccrual::new(0, -1, Money::zero()).is_err());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("Reject".parse::<RedemptionPolicy>().unwrap(), RedemptionPolicy::Reject);
        assert_eq!("clamp".parse::<RedemptionPolicy>().unwrap(), RedemptionPolicy::Clamp);
        assert!("maybe".parse::<RedemptionPolicy>().is_err());
    }
}
