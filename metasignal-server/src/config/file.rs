//! TOML file configuration structures.
//!
//! These structs directly map to the `metasignal.toml` file format.

use alloy_primitives::Address;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

/// Server configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// JSON-RPC node the pipeline reads the chain from.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: Url,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pair factory. When set, every pair it creates is indexed as well.
    #[serde(default)]
    pub factory: Option<Address>,
}

fn default_request_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,
    #[serde(default = "default_initial_lookback")]
    pub initial_lookback: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_concurrency: default_max_concurrency(),
            max_block_range: default_max_block_range(),
            initial_lookback: default_initial_lookback(),
        }
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_block_range() -> u64 {
    2_000
}

fn default_initial_lookback() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Newest entries kept per subscriber. `0` keeps everything.
    #[serde(default = "default_retain_latest")]
    pub retain_latest: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            retain_latest: default_retain_latest(),
        }
    }
}

fn default_retain_latest() -> usize {
    1_000
}

/// Swap fee applied by `/api/quote` when the request carries none, and by
/// the pool quote endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_fee_numerator")]
    pub fee_numerator: u64,
    #[serde(default = "default_fee_denominator")]
    pub fee_denominator: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fee_numerator: default_fee_numerator(),
            fee_denominator: default_fee_denominator(),
        }
    }
}

fn default_fee_numerator() -> u64 {
    997
}

fn default_fee_denominator() -> u64 {
    1000
}

/// A pool to index.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub address: Address,
    /// The two assets of the pair, in any order.
    pub assets: [Address; 2],
    /// First block to index when the pool has no cursor yet.
    #[serde(default)]
    pub start_block: Option<u64>,
}
