//! # Customer Repository
//!
//! Profile operations for loyalty customers.
//!
//! Loyalty balance and lifetime statistics change as a side effect of an
//! order only through the Loyalty Ledger inside the order's unit of work.
//! The one exception here is [`CustomerRepository::set_loyalty_points`], a
//! manual correction made by staff.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::validation::{validate_customer_name, validate_points};
use tally_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, loyalty_points, \
     total_spend_cents, total_purchases, last_visit, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");

        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Lists customers by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name LIMIT ?1");

        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        validate_customer_name(&customer.name)?;
        validate_points("loyalty_points", customer.loyalty_points)?;

        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, email, loyalty_points,
                total_spend_cents, total_purchases, last_visit,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(customer.loyalty_points)
        .bind(customer.total_spend_cents)
        .bind(customer.total_purchases)
        .bind(customer.last_visit)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }

    /// Updates name and contact details. Loyalty fields are untouched.
    pub async fn update_profile(&self, customer: &Customer) -> DbResult<()> {
        validate_customer_name(&customer.name)?;

        debug!(id = %customer.id, "Updating customer profile");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2,
                phone = ?3,
                email = ?4,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    /// Manual loyalty correction. Absolute value, never negative.
    pub async fn set_loyalty_points(&self, id: &str, points: i64) -> DbResult<()> {
        validate_points("loyalty_points", points)?;

        debug!(id = %id, points = points, "Setting loyalty points");

        let result = sqlx::query(
            "UPDATE customers SET loyalty_points = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(points)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_update_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let mut ana = Customer::new("Ana").with_points(20);
        repo.insert(&ana).await.unwrap();
        repo.insert(&Customer::new("Bo")).await.unwrap();

        ana.email = Some("ana@example.com".to_string());
        ana.loyalty_points = 9_999; // ignored by update_profile
        repo.update_profile(&ana).await.unwrap();

        let stored = repo.get_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.email.as_deref(), Some("ana@example.com"));
        assert_eq!(stored.loyalty_points, 20);
        assert!(stored.last_visit.is_none());

        let listed = repo.list(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Ana");
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_set_loyalty_points() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let customer = Customer::new("Cy");
        repo.insert(&customer).await.unwrap();

        repo.set_loyalty_points(&customer.id, 50).await.unwrap();
        let stored = repo.get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.loyalty_points, 50);

        assert!(matches!(
            repo.set_loyalty_points(&customer.id, -1).await,
            Err(DbError::Validation(_))
        ));
        assert!(matches!(
            repo.set_loyalty_points("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
