//! Persistence ports.
//!
//! The pipeline only needs three of them:
//!
//! - [`CursorStore`]: per-pool watermark of the last fully processed block
//! - [`FollowerIndex`]: who follows a given actor
//! - [`FeedStore`]: per-subscriber append-only feed
//!
//! [`FollowRegistry`] is the write side of the follow graph, used by the
//! registration API only.
//!
//! Every port has an in-memory implementation ([`memory`]) and a Postgres
//! one ([`postgres`]).

pub mod memory;
pub mod postgres;

use crate::entities::feed_entry::FeedEntry;
use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur while reading or writing a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be mapped back to a domain type
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The store refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Last fully processed block of `pool`, if one was ever stored.
    async fn load(&self, pool: Address) -> Result<Option<u64>, StoreError>;

    /// Persist `block` as processed for `pool`.
    ///
    /// The cursor never moves backwards: storing a lower block than the
    /// current one is a no-op. Returns the cursor after the write.
    async fn advance(&self, pool: Address, block: u64) -> Result<u64, StoreError>;
}

/// Liveness of the backing storage, reported by `/ready`.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FollowerIndex: Send + Sync {
    /// Subscribers currently following `actor`.
    async fn followers_of(&self, actor: Address) -> Result<BTreeSet<Address>, StoreError>;
}

/// Outcome of [`FeedStore::append`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub inserted: u64,
    /// Entries whose `(subscriber, pool, tx_hash)` key was delivered before.
    pub duplicates: u64,
}

/// A window into a feed, counted from the oldest retained entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPage {
    pub offset: usize,
    pub limit: usize,
}

impl FeedPage {
    pub const DEFAULT_LIMIT: usize = 100;
    pub const MAX_LIMIT: usize = 1000;

    /// Build a page, clamping the limit to [`FeedPage::MAX_LIMIT`].
    pub fn new(offset: Option<usize>, limit: Option<usize>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).min(Self::MAX_LIMIT),
        }
    }
}

impl Default for FeedPage {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Append `entries` in the given order.
    ///
    /// Entries whose `(subscriber, pool, tx_hash)` key was delivered before
    /// are skipped silently, even when retention has since dropped them.
    /// Either every entry is written (or skipped) or an
    /// error is returned.
    async fn append(&self, entries: Vec<FeedEntry>) -> Result<AppendOutcome, StoreError>;

    /// Feed of `subscriber`, oldest entry first.
    async fn get_feed(
        &self,
        subscriber: Address,
        page: FeedPage,
    ) -> Result<Vec<FeedEntry>, StoreError>;
}

/// Errors returned by [`FollowRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("address {0} is not registered")]
    NotRegistered(Address),

    #[error("an address cannot follow itself")]
    SelfFollow,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait FollowRegistry: Send + Sync {
    /// Register a subscriber. Returns `false` if it already existed.
    async fn register(&self, subscriber: Address) -> Result<bool, RegistryError>;

    /// Add `actor` to the follow list of `subscriber`, returning the list.
    ///
    /// Following an actor twice is a no-op.
    async fn follow(&self, subscriber: Address, actor: Address)
    -> Result<Vec<Address>, RegistryError>;

    /// Remove `actor` from the follow list of `subscriber`, returning the list.
    async fn unfollow(
        &self,
        subscriber: Address,
        actor: Address,
    ) -> Result<Vec<Address>, RegistryError>;

    /// Actors followed by `subscriber`, sorted.
    async fn follows(&self, subscriber: Address) -> Result<Vec<Address>, RegistryError>;
}
