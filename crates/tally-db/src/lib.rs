//! # tally-db: Ledger Store and Order Commit for the Tally Back Office
//!
//! This crate provides database access for the Tally back office.
//! It uses SQLite for storage with sqlx for async operations, and owns the
//! transaction boundary of order placement.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Controller (POST /orders, GET /orders, GET /orders/:id/items)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    commit     │    │ Repositories │  │   │
//! │  │   │   (pool.rs)   │    │               │    │              │  │   │
//! │  │   │               │◄───│ Coordinator   │    │ ProductRepo  │  │   │
//! │  │   │ SqlitePool    │    │ StockAdjuster │    │ CustomerRepo │  │   │
//! │  │   │ busy timeout  │    │ LoyaltyLedger │    │ OrderRepo    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   products • customers • orders • order_items                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`commit`] - Order Commit Coordinator, Stock Adjuster, Loyalty Ledger
//! - [`repository`] - Products, customers, order history
//! - [`config`] - TOML + environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, LedgerConfig};
//! use tally_core::{OrderItemInput, PlaceOrderRequest};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let request = PlaceOrderRequest::new(vec![OrderItemInput::new(&product_id, 3, 500)]);
//! let order = db.order_commit(config.commit_policy()).place_order(&request).await?;
//!
//! let history = db.orders().list_orders().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commit;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use commit::{CommitError, CommitPolicy, FailureKind, OrderCommitCoordinator};
pub use config::{ConfigError, LedgerConfig};
pub use error::{DbError, DbResult};
pub use migrations::{migration_status, MigrationStatus};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
