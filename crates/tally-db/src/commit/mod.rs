//! # Order Commit Coordinator
//!
//! Places an order as ONE unit of work: order row, line items, stock
//! decrements and loyalty accrual commit together or not at all.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       place_order(request)                              │
//! │                                                                         │
//! │  1. request.prepare_*()         pure: validate + compute total          │
//! │       │                         (failure → Validation, nothing opened)  │
//! │       ▼                                                                 │
//! │  2. pool.begin()                (closed/unreachable → Configuration)    │
//! │       │                                                                 │
//! │       ▼  ┌──────────── bounded by commit_timeout ─────────────┐         │
//! │  3. INSERT orders               first statement = write lock   │         │
//! │  4. for each line, in order:                                   │         │
//! │       INSERT order_items                                       │         │
//! │       StockAdjuster::decrement                                 │         │
//! │  5. LoyaltyLedger::accrue       only with a customer           │         │
//! │       │  └─────────────────────────────────────────────────────┘         │
//! │       ▼                                                                 │
//! │  6. COMMIT  → Ok(Order)                                                 │
//! │                                                                         │
//! │  7. any failure in 3-5 or timeout → ROLLBACK → Err(CommitError)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! SQLite has a single writer. The order INSERT is always the first
//! statement, so a unit of work takes the write lock up front and concurrent
//! placements queue behind it (up to the connection's busy timeout). Stock
//! uses delta updates and loyalty a guarded read-compute-write, so no
//! update is lost whatever the commit order.
//!
//! ## Retries
//! None. A [`FailureKind::Contention`] failure guarantees nothing was
//! written, so the caller may resubmit; resubmitting creates a new order.

pub mod loyalty;
pub mod stock;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use tally_core::{
    CoreError, Order, OrderStatus, PlaceOrderRequest, PreparedOrder, RedemptionPolicy,
    StockPolicy, DEFAULT_PAYMENT_METHOD,
};

use self::loyalty::{AccrualOutcome, LoyaltyLedger};
use self::stock::{StockAdjuster, StockOutcome};

/// Default bound on steps 3-5 of a placement.
pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Policy
// =============================================================================

/// Business knobs of the commit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPolicy {
    pub stock: StockPolicy,
    pub redemption: RedemptionPolicy,
    pub commit_timeout: Duration,
    /// Recorded when a request names no payment method.
    pub default_payment_method: String,
}

impl Default for CommitPolicy {
    fn default() -> Self {
        CommitPolicy {
            stock: StockPolicy::default(),
            redemption: RedemptionPolicy::default(),
            commit_timeout: DEFAULT_COMMIT_TIMEOUT,
            default_payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        }
    }
}

impl CommitPolicy {
    pub fn with_stock_floor(mut self, floor: i64) -> Self {
        self.stock = StockPolicy::with_floor(floor);
        self
    }

    pub fn with_redemption(mut self, policy: RedemptionPolicy) -> Self {
        self.redemption = policy;
        self
    }

    pub fn with_commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = timeout;
        self
    }

    pub fn with_default_payment_method(mut self, method: impl Into<String>) -> Self {
        self.default_payment_method = method.into();
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// What kind of failure a caller is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request itself is malformed. Nothing was opened.
    Validation,
    /// The store is unavailable. Nothing was opened.
    Configuration,
    /// A referenced product or customer is missing, or cannot cover the
    /// order (stock floor, points balance).
    Referential,
    /// Lock wait or timeout. Rolled back; safe to resubmit.
    Contention,
    /// Anything else mid-transaction, including counter overflow. Rolled
    /// back.
    Integrity,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Validation => "validation",
            FailureKind::Configuration => "configuration",
            FailureKind::Referential => "referential",
            FailureKind::Contention => "contention",
            FailureKind::Integrity => "integrity",
        };
        f.write_str(s)
    }
}

/// Why an order could not be committed.
///
/// Whatever the variant, the Ledger Store is exactly as it was before the
/// call.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Invalid order: {0}")]
    Invalid(#[source] CoreError),

    #[error("Ledger store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Stock floor or points balance refused the order.
    #[error("Order rejected: {0}")]
    Rejected(#[source] CoreError),

    /// A stored counter would overflow if the order were applied.
    #[error("Order arithmetic overflowed: {0}")]
    Overflow(#[source] CoreError),

    #[error("Order commit contended: {0}")]
    Contention(#[source] DbError),

    #[error("Order commit timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Customer {0} was modified concurrently")]
    ConcurrentUpdate(String),

    #[error("Order could not be completed: {0}")]
    Aborted(#[source] DbError),
}

impl CommitError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CommitError::Invalid(_) => FailureKind::Validation,
            CommitError::StoreUnavailable(_) => FailureKind::Configuration,
            CommitError::ProductNotFound(_)
            | CommitError::CustomerNotFound(_)
            | CommitError::Rejected(_) => FailureKind::Referential,
            CommitError::Contention(_)
            | CommitError::TimedOut(_)
            | CommitError::ConcurrentUpdate(_) => FailureKind::Contention,
            CommitError::Overflow(_) | CommitError::Aborted(_) => FailureKind::Integrity,
        }
    }

    /// Only contention failures may be resubmitted verbatim.
    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Contention
    }

    /// Classifies a refusal by the stock or loyalty calculators.
    fn refused(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { .. } | CoreError::InsufficientPoints { .. } => {
                CommitError::Rejected(err)
            }
            other => CommitError::Overflow(other),
        }
    }

    /// Classifies a store error raised while opening the unit of work.
    fn at_open(err: DbError) -> Self {
        if err.is_contention() {
            CommitError::Contention(err)
        } else {
            CommitError::StoreUnavailable(err)
        }
    }

    /// Classifies a store error raised inside the unit of work.
    fn in_flight(err: DbError) -> Self {
        if err.is_contention() {
            CommitError::Contention(err)
        } else {
            CommitError::Aborted(err)
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// Owns the transaction boundary of order placement.
#[derive(Debug, Clone)]
pub struct OrderCommitCoordinator {
    pool: SqlitePool,
    policy: CommitPolicy,
}

impl OrderCommitCoordinator {
    pub fn new(pool: SqlitePool, policy: CommitPolicy) -> Self {
        OrderCommitCoordinator { pool, policy }
    }

    /// Places an order atomically and returns it as persisted.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let request = PlaceOrderRequest::new(vec![OrderItemInput::new(&beans.id, 3, 500)])
    ///     .with_customer(&ana.id)
    ///     .with_points(0, 5);
    ///
    /// match db.order_commit(CommitPolicy::default()).place_order(&request).await {
    ///     Ok(order) => println!("order {} total {}", order.id, order.total()),
    ///     Err(e) if e.is_retryable() => { /* ask the cashier to try again */ }
    ///     Err(e) => return Err(e.into()),
    /// }
    /// ```
    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<Order, CommitError> {
        let prepared = request
            .prepare_with_default_method(&self.policy.default_payment_method)
            .map_err(CommitError::Invalid)?;

        if self.pool.is_closed() {
            return Err(CommitError::StoreUnavailable(DbError::ConnectionFailed(
                "Pool is closed".to_string(),
            )));
        }

        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            order_id = %order_id,
            items = prepared.items.len(),
            total = %prepared.total,
            "Opening order unit of work"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CommitError::at_open(e.into()))?;

        let outcome = tokio::time::timeout(
            self.policy.commit_timeout,
            self.write_order(&mut tx, &order_id, &prepared, now),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(())) => {
                return match tx.commit().await {
                    Ok(()) => {
                        info!(
                            order_id = %order_id,
                            total = %prepared.total,
                            customer_id = ?prepared.customer_id(),
                            "Order committed"
                        );
                        Ok(Order {
                            id: order_id,
                            customer_id: prepared.customer_id().map(str::to_string),
                            total_cents: prepared.total.cents(),
                            payment_method: prepared.payment_method,
                            status: OrderStatus::Completed,
                            items: prepared.items,
                            created_at: now,
                        })
                    }
                    Err(e) => {
                        // a failed COMMIT leaves SQLite's transaction rolled
                        // back or still open; the dropped handle rolls it back
                        let err = CommitError::in_flight(e.into());
                        log_abort(&order_id, &err);
                        Err(err)
                    }
                };
            }
            Ok(Err(e)) => e,
            Err(_elapsed) => CommitError::TimedOut(self.policy.commit_timeout),
        };

        if let Err(e) = tx.rollback().await {
            // the connection is discarded by the pool; nothing was committed
            error!(order_id = %order_id, error = %e, "Rollback failed");
        }
        log_abort(&order_id, &failure);
        Err(failure)
    }

    /// Steps 3-5. Every statement runs on `conn`, the open unit of work.
    async fn write_order(
        &self,
        conn: &mut SqliteConnection,
        order_id: &str,
        prepared: &PreparedOrder,
        now: DateTime<Utc>,
    ) -> Result<(), CommitError> {
        let snapshot = serde_json::to_string(&prepared.items)
            .map_err(|e| CommitError::Aborted(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, total_cents, payment_method,
                status, items_snapshot, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(order_id)
        .bind(prepared.customer_id())
        .bind(prepared.total.cents())
        .bind(&prepared.payment_method)
        .bind(OrderStatus::Completed)
        .bind(&snapshot)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => CommitError::CustomerNotFound(
                prepared.customer_id().unwrap_or_default().to_string(),
            ),
            other => CommitError::in_flight(other),
        })?;

        let adjuster = StockAdjuster::new(self.policy.stock);

        for item in &prepared.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, quantity,
                    unit_price_cents, returned_quantity, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    CommitError::ProductNotFound(item.product_id.clone())
                }
                other => CommitError::in_flight(other),
            })?;

            match adjuster
                .decrement(&mut *conn, &item.product_id, item.quantity, now)
                .await
                .map_err(CommitError::in_flight)?
            {
                StockOutcome::Applied(_) => {}
                StockOutcome::UnknownProduct => {
                    return Err(CommitError::ProductNotFound(item.product_id.clone()))
                }
                StockOutcome::Rejected(e) => return Err(CommitError::refused(e)),
            }
        }

        if let Some(customer) = &prepared.accrual {
            let ledger = LoyaltyLedger::new(self.policy.redemption);
            match ledger
                .accrue(&mut *conn, &customer.customer_id, &customer.accrual, now)
                .await
                .map_err(CommitError::in_flight)?
            {
                AccrualOutcome::Applied(_) => {}
                AccrualOutcome::UnknownCustomer => {
                    return Err(CommitError::CustomerNotFound(customer.customer_id.clone()))
                }
                AccrualOutcome::Rejected(e) => return Err(CommitError::refused(e)),
                AccrualOutcome::Conflict => {
                    return Err(CommitError::ConcurrentUpdate(customer.customer_id.clone()))
                }
            }
        }

        Ok(())
    }
}

fn log_abort(order_id: &str, err: &CommitError) {
    match err.kind() {
        FailureKind::Integrity => error!(
            order_id = %order_id,
            kind = %err.kind(),
            error = %err,
            "Order commit aborted"
        ),
        kind => warn!(
            order_id = %order_id,
            kind = %kind,
            retryable = err.is_retryable(),
            error = %err,
            "Order commit aborted"
        ),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{Customer, OrderItemInput, Product};

    async fn setup() -> (Database, Product, Customer) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = Product::new("P", "Product P", 500).with_stock(10);
        let customer = Customer::new("C").with_points(20);
        db.products().insert(&product).await.unwrap();
        db.customers().insert(&customer).await.unwrap();
        (db, product, customer)
    }

    #[tokio::test]
    async fn test_invalid_request_opens_nothing() {
        let (db, product, _) = setup().await;
        let request = PlaceOrderRequest::new(vec![OrderItemInput::new(&product.id, 0, 500)]);

        let err = db
            .order_commit(CommitPolicy::default())
            .place_order(&request)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Validation);
        assert!(!err.is_retryable());
        assert_eq!(db.orders().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_referential() {
        let (db, product, _) = setup().await;
        let request = PlaceOrderRequest::new(vec![OrderItemInput::new(&product.id, 1, 500)])
            .with_customer("ghost");

        let err = db
            .order_commit(CommitPolicy::default())
            .place_order(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::CustomerNotFound(ref id) if id == "ghost"));
        assert_eq!(err.kind(), FailureKind::Referential);

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, 10);
    }

    #[tokio::test]
    async fn test_returned_order_matches_stored_order() {
        let (db, product, customer) = setup().await;
        let request = PlaceOrderRequest::new(vec![OrderItemInput::new(&product.id, 2, 500)])
            .with_customer(&customer.id)
            .with_payment_method("Card");

        let order = db
            .order_commit(CommitPolicy::default())
            .place_order(&request)
            .await
            .unwrap();

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.order.total_cents, 1000);
        assert_eq!(stored.order.payment_method, "Card");
        assert_eq!(stored.order.status, OrderStatus::Completed);
        assert_eq!(stored.order.items, order.items);
        assert_eq!(stored.customer_name.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn test_spend_overflow_is_integrity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = Product::new("P", "Product P", 500).with_stock(10);
        let mut customer = Customer::new("Whale").with_points(20);
        customer.total_spend_cents = i64::MAX - 10;
        db.products().insert(&product).await.unwrap();
        db.customers().insert(&customer).await.unwrap();

        let request = PlaceOrderRequest::new(vec![OrderItemInput::new(&product.id, 1, 500)])
            .with_customer(&customer.id)
            .with_points(0, 5);

        let err = db
            .order_commit(CommitPolicy::default())
            .place_order(&request)
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::Overflow(CoreError::AmountOverflow { .. })));
        assert_eq!(err.kind(), FailureKind::Integrity);
        assert!(!err.is_retryable());
        assert_eq!(db.orders().count().await.unwrap(), 0);

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.current_stock, 10);
        let stored = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.loyalty_points, 20);
        assert_eq!(stored.total_spend_cents, i64::MAX - 10);
    }

    #[test]
    fn test_refusals_split_by_cause() {
        let short = CommitError::refused(CoreError::InsufficientStock {
            product_id: "p".into(),
            available: 1,
            requested: 2,
        });
        assert!(matches!(short, CommitError::Rejected(_)));
        assert_eq!(short.kind(), FailureKind::Referential);

        let points = CommitError::refused(CoreError::InsufficientPoints {
            customer_id: "c".into(),
            balance: 1,
            requested: 2,
        });
        assert_eq!(points.kind(), FailureKind::Referential);

        let overflow = CommitError::refused(CoreError::AmountOverflow {
            context: "total spend".into(),
        });
        assert!(matches!(overflow, CommitError::Overflow(_)));
        assert_eq!(overflow.kind(), FailureKind::Integrity);
        assert!(!overflow.is_retryable());
    }

    #[test]
    fn test_failure_kinds() {
        assert!(CommitError::TimedOut(Duration::from_secs(1)).is_retryable());
        assert!(CommitError::Contention(DbError::Busy("locked".into())).is_retryable());
        assert!(CommitError::ConcurrentUpdate("c".into()).is_retryable());
        assert!(!CommitError::ProductNotFound("p".into()).is_retryable());
        assert!(!CommitError::Aborted(DbError::Internal("x".into())).is_retryable());
        assert_eq!(
            CommitError::StoreUnavailable(DbError::ConnectionFailed("x".into())).kind(),
            FailureKind::Configuration
        );
    }

    #[test]
    fn test_policy_builder() {
        let policy = CommitPolicy::default()
            .with_stock_floor(-5)
            .with_redemption(RedemptionPolicy::Reject)
            .with_commit_timeout(Duration::from_millis(50))
            .with_default_payment_method("Card");
        assert_eq!(policy.stock.floor, -5);
        assert_eq!(policy.default_payment_method, "Card");
        assert_eq!(policy.redemption, RedemptionPolicy::Reject);
        assert_eq!(policy.commit_timeout, Duration::from_millis(50));
    }
}
