//! # Ledger Configuration
//!
//! Configuration for the Ledger Store and the order commit path.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                              │
//! │     TALLY_STOCK_FLOOR=0                                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.tally/tally.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "tally.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [orders]
//! stock_floor = 0
//! redemption_policy = "clamp"   # clamp | reject
//! commit_timeout_ms = 10000
//! default_payment_method = "Cash"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::commit::CommitPolicy;
use crate::pool::DbConfig;
use tally_core::{RedemptionPolicy, StockPolicy, DEFAULT_PAYMENT_METHOD};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Section
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Wait for a free pooled connection (milliseconds).
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_ms: u64,

    /// Wait for another connection's write lock (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "tally")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("tally.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    30_000
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_ms: default_acquire_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Orders Section
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    /// Lowest stock level a managed product may be sold down to.
    #[serde(default)]
    pub stock_floor: i64,

    #[serde(default)]
    pub redemption_policy: RedemptionPolicy,

    /// Bound on the statements of one order placement (milliseconds).
    #[serde(default = "default_commit_timeout")]
    pub commit_timeout_ms: u64,

    /// Tag recorded when a request names no payment method.
    #[serde(default = "default_payment_method")]
    pub default_payment_method: String,
}

fn default_commit_timeout() -> u64 {
    10_000
}

fn default_payment_method() -> String {
    DEFAULT_PAYMENT_METHOD.to_string()
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            stock_floor: 0,
            redemption_policy: RedemptionPolicy::default(),
            commit_timeout_ms: default_commit_timeout(),
            default_payment_method: default_payment_method(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub orders: OrderSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tally.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let db = &self.database;

        if db.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }
        if self.orders.commit_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "orders.commit_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.orders.default_payment_method.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "orders.default_payment_method must not be empty".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("TALLY_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TALLY_MAX_CONNECTIONS"),
            }
        }

        if let Ok(ms) = std::env::var("TALLY_BUSY_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.database.busy_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid TALLY_BUSY_TIMEOUT_MS"),
            }
        }

        if let Ok(ms) = std::env::var("TALLY_COMMIT_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(n) => self.orders.commit_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring invalid TALLY_COMMIT_TIMEOUT_MS"),
            }
        }

        if let Ok(floor) = std::env::var("TALLY_STOCK_FLOOR") {
            match floor.parse::<i64>() {
                Ok(n) => self.orders.stock_floor = n,
                Err(_) => warn!(value = %floor, "Ignoring invalid TALLY_STOCK_FLOOR"),
            }
        }

        if let Ok(policy) = std::env::var("TALLY_REDEMPTION_POLICY") {
            match policy.parse() {
                Ok(p) => self.orders.redemption_policy = p,
                Err(e) => warn!(error = %e, "Ignoring invalid TALLY_REDEMPTION_POLICY"),
            }
        }

        if let Ok(method) = std::env::var("TALLY_DEFAULT_PAYMENT_METHOD") {
            self.orders.default_payment_method = method;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "tally")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        DbConfig::new(db.path.clone())
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .acquire_timeout(Duration::from_millis(db.acquire_timeout_ms))
            .busy_timeout(Duration::from_millis(db.busy_timeout_ms))
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        CommitPolicy {
            stock: StockPolicy::with_floor(self.orders.stock_floor),
            redemption: self.orders.redemption_policy,
            commit_timeout: Duration::from_millis(self.orders.commit_timeout_ms),
            default_payment_method: self.orders.default_payment_method.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.orders.stock_floor, 0);
        assert_eq!(config.orders.redemption_policy, RedemptionPolicy::Clamp);
        assert_eq!(config.orders.default_payment_method, "Cash");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/shop.db"

            [orders]
            redemption_policy = "reject"
            stock_floor = -3
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.orders.commit_timeout_ms, 10_000);

        let policy = config.commit_policy();
        assert_eq!(policy.stock.floor, -3);
        assert_eq!(policy.redemption, RedemptionPolicy::Reject);

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(db.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_validation() {
        let mut config = LedgerConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.database.min_connections = 9;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.orders.commit_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_and_save_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");

        let mut config = LedgerConfig::default();
        config.database.path = dir.path().join("tally.db");
        config.orders.stock_floor = 2;
        config.save(Some(path.clone())).unwrap();

        let loaded = LedgerConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.database.path, dir.path().join("tally.db"));
    }
}
