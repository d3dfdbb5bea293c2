//! FanoutDispatcher processor.
//!
//! Turns a batch of swaps into feed entries, one per follower of the swap's
//! actor, and appends them to the Feed Store in a single call.

use crate::entities::feed_entry::FeedEntry;
use crate::entities::swap_event::SwapEvent;
use crate::store::{FeedStore, FollowerIndex, StoreError};
use alloy_primitives::Address;
use itertools::Itertools;
use kanau::processor::Processor;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Swaps observed on one pool within one block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapBatch {
    pub pool: Address,
    pub events: Vec<SwapEvent>,
}

/// Counters of one dispatched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Swaps in the batch.
    pub events: usize,
    /// Feed entries newly written.
    pub delivered: u64,
    /// Feed entries that already existed.
    pub duplicates: u64,
    /// Swaps whose actor nobody follows.
    pub unfollowed: usize,
}

#[derive(Clone)]
pub struct FanoutDispatcher {
    followers: Arc<dyn FollowerIndex>,
    feeds: Arc<dyn FeedStore>,
}

impl FanoutDispatcher {
    pub fn new(followers: Arc<dyn FollowerIndex>, feeds: Arc<dyn FeedStore>) -> Self {
        Self { followers, feeds }
    }
}

impl Processor<SwapBatch> for FanoutDispatcher {
    type Output = DispatchReport;
    type Error = StoreError;

    /// Deliver every swap of `batch` to the feeds of its actor's followers.
    ///
    /// Entries are appended in `(block_number, log_index)` order. The batch
    /// succeeds only if the whole append succeeds; entries that already exist
    /// are counted as duplicates and otherwise ignored.
    async fn process(&self, batch: SwapBatch) -> Result<DispatchReport, StoreError> {
        let mut report = DispatchReport {
            events: batch.events.len(),
            ..DispatchReport::default()
        };
        let mut followers_by_actor: HashMap<Address, BTreeSet<Address>> = HashMap::new();
        let mut entries = Vec::new();

        for event in batch
            .events
            .into_iter()
            .sorted_by_key(|event| (event.block_number, event.log_index))
        {
            if !followers_by_actor.contains_key(&event.actor) {
                let followers = self.followers.followers_of(event.actor).await?;
                followers_by_actor.insert(event.actor, followers);
            }
            let followers = followers_by_actor
                .get(&event.actor)
                .filter(|followers| !followers.is_empty());
            let Some(followers) = followers else {
                report.unfollowed += 1;
                continue;
            };
            entries.extend(
                followers
                    .iter()
                    .map(|subscriber| FeedEntry::new(*subscriber, event.clone())),
            );
        }

        if entries.is_empty() {
            debug!(pool = %batch.pool, events = report.events, "No followed swaps in batch");
            return Ok(report);
        }

        let outcome = self.feeds.append(entries).await?;
        report.delivered = outcome.inserted;
        report.duplicates = outcome.duplicates;

        debug!(
            pool = %batch.pool,
            events = report.events,
            delivered = report.delivered,
            duplicates = report.duplicates,
            "Dispatched swap batch"
        );
        Ok(report)
    }
}
