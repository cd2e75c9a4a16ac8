//! # Stock Adjuster
//!
//! Decrements a product's stock inside the caller's unit of work. It never
//! opens, commits or rolls back a transaction of its own.
//!
//! ## Delta Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ read stock, compute, write absolute value                      │
//! │     (two orders read 10, both write 7 → one sale lost)             │
//! │                                                                     │
//! │  ✅ UPDATE products SET current_stock = current_stock - ?          │
//! │     RETURNING the post-image                                       │
//! │     (the store applies deltas one after another → 10 - 3 - 2 = 5) │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The post-image is judged by [`StockPolicy::check_after`]; a rejection
//! aborts the whole order.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use tally_core::{CoreError, StockLevel, StockPolicy};

/// Post-decrement image returned by the store.
#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    id: String,
    current_stock: i64,
    track_inventory: bool,
    allow_negative_stock: bool,
}

impl From<StockRow> for StockLevel {
    fn from(row: StockRow) -> Self {
        StockLevel {
            product_id: row.id,
            current_stock: row.current_stock,
            track_inventory: row.track_inventory,
            allow_negative_stock: row.allow_negative_stock,
        }
    }
}

/// Outcome of one decrement that the store could execute.
#[derive(Debug)]
pub enum StockOutcome {
    Applied(StockLevel),
    /// No product row with that id.
    UnknownProduct,
    /// Applied in the unit of work but below the floor; the caller must
    /// abort.
    Rejected(CoreError),
}

/// Applies stock deltas for order line items.
#[derive(Debug, Clone, Copy)]
pub struct StockAdjuster {
    policy: StockPolicy,
}

impl StockAdjuster {
    pub fn new(policy: StockPolicy) -> Self {
        StockAdjuster { policy }
    }

    /// `stock = stock - quantity` for one product, judged against the floor.
    pub async fn decrement(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<StockOutcome> {
        let row = sqlx::query_as::<_, StockRow>(
            r#"
            UPDATE products
            SET current_stock = current_stock - ?2,
                updated_at = ?3
            WHERE id = ?1
            RETURNING id, current_stock, track_inventory, allow_negative_stock
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(StockOutcome::UnknownProduct);
        };

        let after = StockLevel::from(row);
        debug!(
            product_id = %product_id,
            quantity = quantity,
            stock_after = after.current_stock,
            "Stock decremented"
        );

        match self.policy.check_after(&after, quantity) {
            Ok(()) => Ok(StockOutcome::Applied(after)),
            Err(e) => Ok(StockOutcome::Rejected(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::Product;

    #[tokio::test]
    async fn test_decrement_inside_transaction_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = Product::new("BEANS", "Beans", 1800).with_stock(10);
        db.products().insert(&product).await.unwrap();

        let adjuster = StockAdjuster::new(StockPolicy::default());
        let mut tx = db.pool().begin().await.unwrap();

        let outcome = adjuster
            .decrement(&mut tx, &product.id, 3, Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, StockOutcome::Applied(ref l) if l.current_stock == 7));

        let outcome = adjuster
            .decrement(&mut tx, &product.id, 8, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            StockOutcome::Rejected(CoreError::InsufficientStock { available: 7, requested: 8, .. })
        ));

        tx.rollback().await.unwrap();

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, 10);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let outcome = StockAdjuster::new(StockPolicy::default())
            .decrement(&mut conn, "missing", 1, Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, StockOutcome::UnknownProduct));
    }
}
