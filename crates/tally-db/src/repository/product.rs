//! # Product Repository
//!
//! Catalog operations for products.
//!
//! ## Key Operations
//! - Lookup by id / SKU, name and SKU substring search
//! - CRUD with soft delete
//! - Manual stock edits (`set_stock`)
//!
//! Sales never go through this repository: stock moves caused by an order
//! are applied by the Stock Adjuster inside the order's unit of work.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use tally_core::validation::{
    validate_price_cents, validate_product_name, validate_search_query, validate_sku,
};
use tally_core::Product;

const PRODUCT_COLUMNS: &str = "id, sku, name, price_cents, cost_cents, \
     track_inventory, allow_negative_stock, current_stock, is_active, \
     created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let results = repo.search("beans", 20).await?;
/// let product = repo.get_by_sku("BEANS-1KG").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by name or SKU substring.
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = like_pattern(&query);
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 \
               AND (name LIKE ?1 ESCAPE '\\' OR sku LIKE ?1 ESCAPE '\\') \
             ORDER BY name \
             LIMIT ?2"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by its ID (including soft-deleted ones).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;
        validate_price_cents(product.price_cents)?;

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_cents, cost_cents,
                track_inventory, allow_negative_stock, current_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with(".sku") => {
                DbError::duplicate("sku", &product.sku)
            }
            other => other,
        })?;

        Ok(product.clone())
    }

    /// Updates an existing product's catalog fields.
    ///
    /// `current_stock` is left alone; use [`set_stock`](Self::set_stock).
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;
        validate_price_cents(product.price_cents)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                price_cents = ?4,
                cost_cents = ?5,
                track_inventory = ?6,
                allow_negative_stock = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Manual stock edit (stock count, receiving). Absolute value.
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<()> {
        debug!(id = %id, stock = stock, "Setting stock");

        let result = sqlx::query(
            "UPDATE products SET current_stock = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting `is_active = 0`.
    ///
    /// Historical order lines still reference the row.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = setup().await;
        let repo = db.products();

        let product = Product::new("BEANS-1KG", "Espresso Beans 1kg", 1800).with_stock(12);
        repo.insert(&product).await.unwrap();

        let by_id = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "BEANS-1KG");
        assert_eq!(by_id.current_stock, 12);
        assert!(by_id.track_inventory);

        let by_sku = repo.get_by_sku("BEANS-1KG").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = setup().await;
        let repo = db.products();

        repo.insert(&Product::new("MUG", "Mug", 900)).await.unwrap();
        let err = repo.insert(&Product::new("MUG", "Other Mug", 950)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "sku"));
    }

    #[tokio::test]
    async fn test_invalid_product_rejected_before_insert() {
        let db = setup().await;
        let err = db
            .products()
            .insert(&Product::new("has space", "Bad", 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_and_soft_delete() {
        let db = setup().await;
        let repo = db.products();

        let beans = Product::new("BEANS-1KG", "Espresso Beans", 1800);
        let filter = Product::new("FILTER-100", "Paper Filters", 400);
        repo.insert(&beans).await.unwrap();
        repo.insert(&filter).await.unwrap();

        let found = repo.search("beans", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, beans.id);

        let by_sku = repo.search("filter-1", 10).await.unwrap();
        assert_eq!(by_sku.len(), 1);

        assert_eq!(repo.search("", 10).await.unwrap().len(), 2);

        repo.soft_delete(&beans.id).await.unwrap();
        assert!(repo.search("beans", 10).await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_and_set_stock() {
        let db = setup().await;
        let repo = db.products();

        let mut product = Product::new("TEA", "Green Tea", 650).with_stock(3);
        repo.insert(&product).await.unwrap();

        product.price_cents = 700;
        product.current_stock = 999; // ignored by update
        repo.update(&product).await.unwrap();
        repo.set_stock(&product.id, 40).await.unwrap();

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.price_cents, 700);
        assert_eq!(stored.current_stock, 40);

        let err = repo.set_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
