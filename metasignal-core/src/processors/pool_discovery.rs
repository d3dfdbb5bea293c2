//! PoolDiscovery processor.
//!
//! Walks the factory's pair list and adds every pair it has not seen yet to
//! the shared pool list. Pairs are read by index, so each refresh only
//! fetches the pairs created since the previous one.
//!
//! Discovered pools are remembered: when the pool list is replaced (e.g. on
//! config reload), the next refresh puts them back.

use crate::config::ConfigStore;
use crate::entities::pool::Pool;
use crate::ledger::{LedgerError, PairDirectory};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct DiscoveryState {
    /// Index of the next factory pair to read.
    next_index: u64,
    discovered: Vec<Pool>,
}

pub struct PoolDiscovery {
    directory: Arc<dyn PairDirectory>,
    state: Mutex<DiscoveryState>,
}

impl PoolDiscovery {
    pub fn new(directory: Arc<dyn PairDirectory>) -> Self {
        Self {
            directory,
            state: Mutex::new(DiscoveryState::default()),
        }
    }

    /// Read new factory pairs and make sure every discovered pool is in
    /// `pools`. Returns the number of pools added to the list.
    ///
    /// Pairs read before a failure are kept; the next refresh continues with
    /// the pair that failed.
    pub async fn refresh(&self, pools: &ConfigStore<Vec<Pool>>) -> Result<usize, LedgerError> {
        let mut state = self.state.lock().await;

        let count = self.directory.pair_count().await?;
        while state.next_index < count {
            let index = state.next_index;
            let pair = self.directory.pair_at(index).await?;
            let [asset_a, asset_b] = self.directory.pair_assets(pair).await?;
            match Pool::new(pair, asset_a, asset_b) {
                Ok(pool) => {
                    info!(pool = %pair, index, "Discovered pool");
                    state.discovered.push(pool);
                }
                Err(e) => warn!(pool = %pair, index, error = %e, "Ignoring factory pair"),
            }
            state.next_index += 1;
        }

        let mut added = 0;
        pools
            .modify(|current| {
                for pool in &state.discovered {
                    if !current.iter().any(|known| known.address == pool.address) {
                        current.push(pool.clone());
                        added += 1;
                    }
                }
                added > 0
            })
            .await;
        Ok(added)
    }
}
