//! # Seed Data Generator
//!
//! Populates the Ledger Store with a small demo catalog, a few customers
//! and one sample order.
//!
//! ## Usage
//! ```bash
//! # Use tally.toml / TALLY_* settings
//! cargo run -p tally-db --bin seed
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//!
//! # More verbose output
//! RUST_LOG=tally_db=debug cargo run -p tally-db --bin seed
//! ```

use std::env;
use std::path::PathBuf;

use tally_core::{Customer, OrderItemInput, PlaceOrderRequest, Product};
use tally_db::{Database, LedgerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (sku, name, price in cents, opening stock). Negative stock means the
/// product is not inventory-managed.
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("BEV-COF-001", "House Coffee", 350, 200),
    ("BEV-TEA-002", "Green Tea", 300, 150),
    ("BAK-CRO-003", "Butter Croissant", 275, 40),
    ("BAK-MUF-004", "Blueberry Muffin", 325, 36),
    ("GRO-BEA-005", "Whole Beans 1kg", 1800, 25),
    ("SRV-GFT-006", "Gift Wrapping", 150, -1),
];

/// (name, opening loyalty points)
const CUSTOMERS: &[(&str, i64)] = &[("Ana Souza", 20), ("Bo Lindqvist", 0), ("Chidi Okafor", 120)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    info!(path = ?config.database.path, "Seeding ledger store");
    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (sku, name, price_cents, stock) in PRODUCTS {
        let product = if *stock < 0 {
            Product::new(*sku, *name, *price_cents).unmanaged()
        } else {
            Product::new(*sku, *name, *price_cents).with_stock(*stock)
        };
        products.push(db.products().insert(&product).await?);
    }
    info!(count = products.len(), "Products inserted");

    let mut customers = Vec::with_capacity(CUSTOMERS.len());
    for (name, points) in CUSTOMERS {
        let customer = Customer::new(*name).with_points(*points);
        customers.push(db.customers().insert(&customer).await?);
    }
    info!(count = customers.len(), "Customers inserted");

    // Ana buys two coffees and a croissant, redeems 10 points, earns 4.
    let request = PlaceOrderRequest::new(vec![
        OrderItemInput::new(&products[0].id, 2, products[0].price_cents),
        OrderItemInput::new(&products[2].id, 1, products[2].price_cents),
    ])
    .with_customer(&customers[0].id)
    .with_points(10, 4);

    let order = db
        .order_commit(config.commit_policy())
        .place_order(&request)
        .await?;
    info!(order_id = %order.id, total = %order.total(), "Sample order placed");

    if let Some(buyer) = db.customers().get_by_id(&customers[0].id).await? {
        info!(
            customer = %buyer.name,
            points = buyer.loyalty_points,
            spend = %buyer.total_spend(),
            "Loyalty updated"
        );
    }

    for summary in db.orders().list_orders().await? {
        let items = db.orders().get_line_items(&summary.order.id).await?;
        info!(
            order_id = %summary.order.id,
            customer = summary.customer_name.as_deref().unwrap_or("-"),
            lines = items.len(),
            total = %summary.order.total(),
            "Order in history"
        );
    }

    db.close().await;
    info!("Seed complete");

    Ok(())
}
