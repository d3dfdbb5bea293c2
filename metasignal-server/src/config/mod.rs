//! Configuration module for metasignal-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments
//! and environment variables, and turns it into the validated runtime
//! types of `metasignal-core`.

pub mod file;

use crate::config::file::{FileConfig, PoolConfig};
use alloy_primitives::Address;
use metasignal_core::config::{FeedConfig, SchedulerConfig};
use metasignal_core::entities::pool::{Pool, PoolError};
use metasignal_core::pricing::{FeeRate, PricingError};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid pool: {0}")]
    Pool(#[from] PoolError),

    #[error("invalid pricing section: {0}")]
    Pricing(#[from] PricingError),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Where and how to reach the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub rpc_url: Url,
    pub request_timeout: Duration,
    pub factory: Option<Address>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub ledger: LedgerSettings,
    pub scheduler: SchedulerConfig,
    pub feed: FeedConfig,
    pub fee: FeeRate,
    pub pools: Vec<Pool>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read, validate and convert the configuration file.
    ///
    /// Also used on SIGHUP; the caller decides which parts of the result it
    /// can apply at runtime.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let file_config: FileConfig = toml::from_str(&config_content)?;
        build_loaded_config(file_config, self.listen_override)
    }
}

fn build_loaded_config(
    file_config: FileConfig,
    listen_override: Option<SocketAddr>,
) -> Result<LoadedConfig, ConfigError> {
    validate(&file_config)?;

    let pools = file_config
        .pools
        .iter()
        .map(convert_pool)
        .collect::<Result<Vec<_>, _>>()?;
    let fee = FeeRate::new(
        file_config.pricing.fee_numerator,
        file_config.pricing.fee_denominator,
    )?;
    let scheduler = &file_config.scheduler;

    Ok(LoadedConfig {
        listen: listen_override.unwrap_or(file_config.server.listen),
        ledger: LedgerSettings {
            rpc_url: file_config.ledger.rpc_url,
            request_timeout: Duration::from_secs(file_config.ledger.request_timeout_secs),
            factory: file_config.ledger.factory,
        },
        scheduler: SchedulerConfig {
            interval: Duration::from_secs(scheduler.interval_secs),
            max_concurrency: scheduler.max_concurrency,
            max_block_range: scheduler.max_block_range,
            initial_lookback: scheduler.initial_lookback,
        },
        feed: FeedConfig {
            retain_latest: Some(file_config.feed.retain_latest).filter(|keep| *keep > 0),
        },
        fee,
        pools,
    })
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.pools.is_empty() && config.ledger.factory.is_none() {
        return Err(ConfigError::ValidationError(
            "at least one pool or a ledger.factory must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for pool in &config.pools {
        if !seen.insert(pool.address) {
            return Err(ConfigError::ValidationError(format!(
                "pool {} is configured twice",
                pool.address
            )));
        }
    }

    let scheduler = &config.scheduler;
    if scheduler.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.interval_secs must be greater than zero".to_string(),
        ));
    }
    if scheduler.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.max_concurrency must be greater than zero".to_string(),
        ));
    }
    if scheduler.max_block_range == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.max_block_range must be greater than zero".to_string(),
        ));
    }
    if config.ledger.request_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "ledger.request_timeout_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn convert_pool(p: &PoolConfig) -> Result<Pool, PoolError> {
    let [asset_a, asset_b] = p.assets;
    let pool = Pool::new(p.address, asset_a, asset_b)?;
    Ok(match p.start_block {
        Some(start_block) => pool.with_start_block(start_block),
        None => pool,
    })
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
