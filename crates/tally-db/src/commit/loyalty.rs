//! # Loyalty Ledger
//!
//! Persists a [`LoyaltyAccrual`] inside the caller's unit of work.
//!
//! ## Read-Compute-Write Under the Write Lock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  (order row already inserted → this connection holds the write lock)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT loyalty_points, total_spend_cents, total_purchases             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LoyaltyAccrual::apply()   ← pure, tally-core                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE customers SET ... WHERE id = ? AND <fields still as read>      │
//! │       │                                                                 │
//! │       ├── 1 row  → Applied                                             │
//! │       └── 0 rows → Conflict (someone else wrote the row)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{CoreError, LoyaltyAccrual, LoyaltyState, RedemptionPolicy};

/// Outcome of one accrual.
#[derive(Debug)]
pub enum AccrualOutcome {
    Applied(LoyaltyState),
    UnknownCustomer,
    /// The calculator refused (over-redemption under `Reject`, overflow).
    Rejected(CoreError),
    /// The customer row changed between read and write.
    Conflict,
}

/// Applies loyalty accruals to customer rows.
#[derive(Debug, Clone, Copy)]
pub struct LoyaltyLedger {
    policy: RedemptionPolicy,
}

impl LoyaltyLedger {
    pub fn new(policy: RedemptionPolicy) -> Self {
        LoyaltyLedger { policy }
    }

    pub async fn accrue(
        &self,
        conn: &mut SqliteConnection,
        customer_id: &str,
        accrual: &LoyaltyAccrual,
        now: DateTime<Utc>,
    ) -> DbResult<AccrualOutcome> {
        let before = sqlx::query_as::<_, LoyaltyState>(
            "SELECT loyalty_points, total_spend_cents, total_purchases \
             FROM customers WHERE id = ?1",
        )
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(before) = before else {
            return Ok(AccrualOutcome::UnknownCustomer);
        };

        let after = match accrual.apply(customer_id, &before, self.policy) {
            Ok(after) => after,
            Err(e) => return Ok(AccrualOutcome::Rejected(e)),
        };

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                loyalty_points = ?2,
                total_spend_cents = ?3,
                total_purchases = ?4,
                last_visit = ?5,
                updated_at = ?5
            WHERE id = ?1
              AND loyalty_points = ?6
              AND total_spend_cents = ?7
              AND total_purchases = ?8
            "#,
        )
        .bind(customer_id)
        .bind(after.loyalty_points)
        .bind(after.total_spend_cents)
        .bind(after.total_purchases)
        .bind(now)
        .bind(before.loyalty_points)
        .bind(before.total_spend_cents)
        .bind(before.total_purchases)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(AccrualOutcome::Conflict);
        }

        debug!(
            customer_id = %customer_id,
            redeemed = accrual.redeemed(),
            earned = accrual.earned(),
            spend = %accrual.order_total(),
            points_before = before.loyalty_points,
            points_after = after.loyalty_points,
            "Loyalty accrued"
        );

        Ok(AccrualOutcome::Applied(after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{Customer, Money};

    #[tokio::test]
    async fn test_accrue_updates_statistics() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = Customer::new("Ana").with_points(20);
        db.customers().insert(&customer).await.unwrap();

        let accrual = LoyaltyAccrual::new(0, 5, Money::from_cents(1500)).unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let outcome = LoyaltyLedger::new(RedemptionPolicy::Clamp)
            .accrue(&mut conn, &customer.id, &accrual, Utc::now())
            .await
            .unwrap();
        drop(conn);

        assert!(matches!(outcome, AccrualOutcome::Applied(s) if s.loyalty_points == 25));

        let stored = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.loyalty_points, 25);
        assert_eq!(stored.total_spend_cents, 1500);
        assert_eq!(stored.total_purchases, 1);
        assert!(stored.last_visit.is_some());
    }

    #[tokio::test]
    async fn test_reject_policy_leaves_row_untouched() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = Customer::new("Bo").with_points(3);
        db.customers().insert(&customer).await.unwrap();

        let accrual = LoyaltyAccrual::new(10, 0, Money::zero()).unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let outcome = LoyaltyLedger::new(RedemptionPolicy::Reject)
            .accrue(&mut conn, &customer.id, &accrual, Utc::now())
            .await
            .unwrap();
        drop(conn);

        assert!(matches!(
            outcome,
            AccrualOutcome::Rejected(CoreError::InsufficientPoints { .. })
        ));
        let stored = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.loyalty_points, 3);
        assert_eq!(stored.total_purchases, 0);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let accrual = LoyaltyAccrual::new(0, 1, Money::zero()).unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let outcome = LoyaltyLedger::new(RedemptionPolicy::default())
            .accrue(&mut conn, "missing", &accrual, Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, AccrualOutcome::UnknownCustomer));
    }
}
