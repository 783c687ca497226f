//! Configuration for the swap ledger

use crate::types::{AccountId, ExternalAddress};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default conversion ratio: token minimal units per one external unit
pub const DEFAULT_CONVERSION_RATIO: u64 = 100_000;

/// Ledger configuration
///
/// Genesis identities (administrator, pools) and the initial conversion
/// ratio are seeded into storage on first open; a reopened ledger keeps its
/// persisted registry and ignores the config values for seeded keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Administrator account (genesis)
    pub admin: AccountId,

    /// Token custody pool account (genesis)
    pub token_pool: AccountId,

    /// External-network pool address (genesis, audit context only)
    pub external_pool: ExternalAddress,

    /// Initial conversion ratio (genesis)
    pub initial_ratio: u64,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/swap-ledger"),
            service_name: "swap-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            admin: AccountId::new("admin"),
            token_pool: AccountId::new("pool:token"),
            external_pool: ExternalAddress::new("pool:external"),
            initial_ratio: DEFAULT_CONVERSION_RATIO,
            rocksdb: RocksDbConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 2,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("SWAP_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(admin) = std::env::var("SWAP_LEDGER_ADMIN") {
            config.admin = AccountId::new(admin);
        }

        if let Ok(pool) = std::env::var("SWAP_LEDGER_TOKEN_POOL") {
            config.token_pool = AccountId::new(pool);
        }

        if let Ok(pool) = std::env::var("SWAP_LEDGER_EXTERNAL_POOL") {
            config.external_pool = ExternalAddress::new(pool);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check genesis identities are usable
    pub fn validate(&self) -> crate::Result<()> {
        if self.admin.is_malformed() {
            return Err(crate::Error::Config(
                "Administrator account must not be void or empty".to_string(),
            ));
        }
        if self.token_pool.is_malformed() {
            return Err(crate::Error::Config(
                "Token pool account must not be void or empty".to_string(),
            ));
        }
        if self.external_pool.as_str().is_empty() {
            return Err(crate::Error::Config(
                "External pool address must not be empty".to_string(),
            ));
        }
        if self.initial_ratio == 0 {
            return Err(crate::Error::Config(
                "Initial conversion ratio must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "swap-ledger");
        assert_eq!(config.initial_ratio, 100_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_void_admin() {
        let mut config = Config::default();
        config.admin = AccountId::void();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ratio() {
        let mut config = Config::default();
        config.initial_ratio = 0;
        assert!(config.validate().is_err());
    }
}
