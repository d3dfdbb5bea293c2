//! Application state shared across all request handlers.

use metasignal_core::config::ConfigStore;
use metasignal_core::entities::pool::Pool;
use metasignal_core::ledger::ReserveSource;
use metasignal_core::pricing::FeeRate;
use metasignal_core::store::{FeedStore, FollowRegistry, StoreHealth};
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// Cheap to clone: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub feeds: Arc<dyn FeedStore>,
    pub registry: Arc<dyn FollowRegistry>,
    pub reserves: Arc<dyn ReserveSource>,
    pub health: Arc<dyn StoreHealth>,
    /// Indexed pools: configured ones, swapped on SIGHUP, plus discovered
    /// factory pairs.
    pub pools: ConfigStore<Vec<Pool>>,
    /// Fee used when a quote request does not carry its own.
    pub fee: FeeRate,
}

impl AppState {
    /// Look up a registered pool by address.
    pub async fn pool(&self, address: alloy_primitives::Address) -> Option<Pool> {
        self.pools
            .read()
            .await
            .iter()
            .find(|pool| pool.address == address)
            .cloned()
    }
}
