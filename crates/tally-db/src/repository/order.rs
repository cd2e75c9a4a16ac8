//! # Order Repository (Order Query Service)
//!
//! Read-only retrieval of historical orders and their line items.
//!
//! ## Read Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list_orders()                                                         │
//! │    orders LEFT JOIN customers → OrderSummary { order, customer_name }  │
//! │    newest first (created_at DESC, insertion order breaks ties)         │
//! │                                                                         │
//! │  get_line_items(order_id)                                              │
//! │    order_items JOIN products → LineItemDetail { .., product_name }     │
//! │    unknown order       → DbError::NotFound                             │
//! │    order with no lines → Ok(vec![])                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are written only by the Order Commit Coordinator.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{LineItemDetail, Order, OrderItemInput, OrderStatus, OrderSummary};

const ORDER_SELECT: &str = r#"
    SELECT
        o.id,
        o.customer_id,
        o.total_cents,
        o.payment_method,
        o.status,
        o.items_snapshot,
        o.created_at,
        c.name AS customer_name
    FROM orders o
    LEFT JOIN customers c ON c.id = o.customer_id
"#;

/// Raw `orders` row; `items_snapshot` is still JSON text.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_id: Option<String>,
    total_cents: i64,
    payment_method: String,
    status: OrderStatus,
    items_snapshot: String,
    created_at: DateTime<Utc>,
    customer_name: Option<String>,
}

impl TryFrom<OrderRow> for OrderSummary {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let items: Vec<OrderItemInput> = serde_json::from_str(&row.items_snapshot)?;
        Ok(OrderSummary {
            order: Order {
                id: row.id,
                customer_id: row.customer_id,
                total_cents: row.total_cents,
                payment_method: row.payment_method,
                status: row.status,
                items,
                created_at: row.created_at,
            },
            customer_name: row.customer_name,
        })
    }
}

/// Repository for order history.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// All orders, newest first, each with its customer's display name.
    pub async fn list_orders(&self) -> DbResult<Vec<OrderSummary>> {
        let sql = format!("{ORDER_SELECT} ORDER BY o.created_at DESC, o.rowid DESC");

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed orders");
        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    pub async fn get_by_id(&self, order_id: &str) -> DbResult<Option<OrderSummary>> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = ?1");

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(OrderSummary::try_from).transpose()
    }

    /// Line items of one order joined with product names, in the order the
    /// caller submitted them.
    pub async fn get_line_items(&self, order_id: &str) -> DbResult<Vec<LineItemDetail>> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(DbError::not_found("Order", order_id));
        }

        let items = sqlx::query_as::<_, LineItemDetail>(
            r#"
            SELECT
                oi.id,
                oi.order_id,
                oi.product_id,
                p.name AS product_name,
                oi.quantity,
                oi.unit_price_cents,
                oi.returned_quantity
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = ?1
            ORDER BY oi.rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
