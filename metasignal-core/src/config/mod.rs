//! Validated runtime configuration shared with the server crate.
//!
//! Loading and parsing the configuration file is the server's job; the
//! types here are what the pipeline actually consumes.

mod config_store;

pub use config_store::{ConfigStore, ConfigWatcher};

use std::time::Duration;

/// Poll Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between two ticks.
    pub interval: Duration,
    /// Pools synced at the same time within one tick.
    pub max_concurrency: usize,
    /// Widest block range requested from the ledger in one `get_logs` call.
    pub max_block_range: u64,
    /// How far behind the chain head a pool without a cursor starts.
    pub initial_lookback: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_concurrency: 4,
            max_block_range: 2_000,
            initial_lookback: 5,
        }
    }
}

/// Feed Store settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedConfig {
    /// Newest entries kept per subscriber; `None` disables pruning.
    pub retain_latest: Option<usize>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            retain_latest: Some(1_000),
        }
    }
}
