//! In-process stores.
//!
//! State lives behind `tokio::sync::RwLock`s and is lost on restart.

use super::{
    AppendOutcome, CursorStore, FeedPage, FeedStore, FollowRegistry, FollowerIndex,
    RegistryError, StoreError, StoreHealth,
};
use crate::entities::feed_entry::{FeedEntry, FeedKey};
use alloy_primitives::Address;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursors: RwLock<HashMap<Address, u64>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self, pool: Address) -> Result<Option<u64>, StoreError> {
        Ok(self.cursors.read().await.get(&pool).copied())
    }

    async fn advance(&self, pool: Address, block: u64) -> Result<u64, StoreError> {
        let mut cursors = self.cursors.write().await;
        let cursor = cursors.entry(pool).or_insert(block);
        *cursor = (*cursor).max(block);
        Ok(*cursor)
    }
}

#[derive(Debug, Default)]
struct FollowGraph {
    /// subscriber -> followed actors
    follows: HashMap<Address, BTreeSet<Address>>,
    /// actor -> subscribers
    followers: HashMap<Address, BTreeSet<Address>>,
}

/// Follow graph implementing both the read ([`FollowerIndex`]) and the
/// write ([`FollowRegistry`]) side.
#[derive(Debug, Default)]
pub struct MemoryFollowGraph {
    graph: RwLock<FollowGraph>,
}

impl MemoryFollowGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FollowerIndex for MemoryFollowGraph {
    async fn followers_of(&self, actor: Address) -> Result<BTreeSet<Address>, StoreError> {
        let graph = self.graph.read().await;
        Ok(graph.followers.get(&actor).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl FollowRegistry for MemoryFollowGraph {
    async fn register(&self, subscriber: Address) -> Result<bool, RegistryError> {
        let mut graph = self.graph.write().await;
        if graph.follows.contains_key(&subscriber) {
            return Ok(false);
        }
        graph.follows.insert(subscriber, BTreeSet::new());
        Ok(true)
    }

    async fn follow(
        &self,
        subscriber: Address,
        actor: Address,
    ) -> Result<Vec<Address>, RegistryError> {
        if subscriber == actor {
            return Err(RegistryError::SelfFollow);
        }
        let mut graph = self.graph.write().await;
        let follows = graph
            .follows
            .get_mut(&subscriber)
            .ok_or(RegistryError::NotRegistered(subscriber))?;
        follows.insert(actor);
        let list = follows.iter().copied().collect();
        graph.followers.entry(actor).or_default().insert(subscriber);
        Ok(list)
    }

    async fn unfollow(
        &self,
        subscriber: Address,
        actor: Address,
    ) -> Result<Vec<Address>, RegistryError> {
        let mut graph = self.graph.write().await;
        let follows = graph
            .follows
            .get_mut(&subscriber)
            .ok_or(RegistryError::NotRegistered(subscriber))?;
        follows.remove(&actor);
        let list = follows.iter().copied().collect();
        if let Some(followers) = graph.followers.get_mut(&actor) {
            followers.remove(&subscriber);
            if followers.is_empty() {
                graph.followers.remove(&actor);
            }
        }
        Ok(list)
    }

    async fn follows(&self, subscriber: Address) -> Result<Vec<Address>, RegistryError> {
        let graph = self.graph.read().await;
        graph
            .follows
            .get(&subscriber)
            .map(|follows| follows.iter().copied().collect())
            .ok_or(RegistryError::NotRegistered(subscriber))
    }
}

#[derive(Debug, Default)]
struct SubscriberFeed {
    entries: VecDeque<FeedEntry>,
    /// Every key ever delivered, including evicted entries.
    keys: HashSet<FeedKey>,
}

#[derive(Debug, Default)]
pub struct MemoryFeedStore {
    feeds: RwLock<HashMap<Address, SubscriberFeed>>,
    /// Newest entries kept per subscriber; `None` keeps everything.
    retain_latest: Option<usize>,
}

impl MemoryFeedStore {
    pub fn new(retain_latest: Option<usize>) -> Self {
        Self {
            feeds: RwLock::default(),
            retain_latest,
        }
    }

    /// Number of entries currently held for `subscriber`.
    pub async fn len(&self, subscriber: Address) -> usize {
        self.feeds
            .read()
            .await
            .get(&subscriber)
            .map_or(0, |feed| feed.entries.len())
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn append(&self, entries: Vec<FeedEntry>) -> Result<AppendOutcome, StoreError> {
        let mut feeds = self.feeds.write().await;
        let mut outcome = AppendOutcome::default();

        for entry in entries {
            let key = entry.key();
            let feed = feeds.entry(entry.subscriber).or_default();
            if !feed.keys.insert(key) {
                outcome.duplicates += 1;
                continue;
            }
            feed.entries.push_back(entry);
            outcome.inserted += 1;

            if let Some(keep) = self.retain_latest {
                while feed.entries.len() > keep {
                    feed.entries.pop_front();
                }
            }
        }

        Ok(outcome)
    }

    async fn get_feed(
        &self,
        subscriber: Address,
        page: FeedPage,
    ) -> Result<Vec<FeedEntry>, StoreError> {
        let feeds = self.feeds.read().await;
        Ok(feeds
            .get(&subscriber)
            .map(|feed| {
                feed.entries
                    .iter()
                    .skip(page.offset)
                    .take(page.limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl StoreHealth for MemoryFeedStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{address, swap};

    #[tokio::test]
    async fn test_cursor_never_moves_backwards() {
        let store = MemoryCursorStore::new();
        let pool = address(0xee);
        assert_eq!(store.load(pool).await.unwrap(), None);
        assert_eq!(store.advance(pool, 110).await.unwrap(), 110);
        assert_eq!(store.advance(pool, 100).await.unwrap(), 110);
        assert_eq!(store.load(pool).await.unwrap(), Some(110));
        assert_eq!(store.load(address(0xef)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_follow_graph() {
        let graph = MemoryFollowGraph::new();
        let (alice, bob, carol) = (address(0xa1), address(0xb0), address(0xc0));

        assert!(matches!(
            graph.follow(alice, bob).await,
            Err(RegistryError::NotRegistered(a)) if a == alice
        ));
        assert!(graph.register(alice).await.unwrap());
        assert!(!graph.register(alice).await.unwrap());

        assert_eq!(graph.follow(alice, carol).await.unwrap(), vec![carol]);
        assert_eq!(graph.follow(alice, bob).await.unwrap(), vec![bob, carol]);
        assert_eq!(graph.follow(alice, bob).await.unwrap(), vec![bob, carol]);
        assert!(matches!(
            graph.follow(alice, alice).await,
            Err(RegistryError::SelfFollow)
        ));

        assert_eq!(
            graph.followers_of(bob).await.unwrap(),
            BTreeSet::from([alice])
        );
        assert_eq!(graph.unfollow(alice, bob).await.unwrap(), vec![carol]);
        assert!(graph.followers_of(bob).await.unwrap().is_empty());
        assert_eq!(graph.follows(alice).await.unwrap(), vec![carol]);
    }

    #[tokio::test]
    async fn test_feed_append_is_idempotent() {
        let store = MemoryFeedStore::new(None);
        let subscriber = address(0x51);
        let entry = FeedEntry::new(subscriber, swap(0xee, 0x58, 42, 0xab, 0));

        let first = store.append(vec![entry.clone()]).await.unwrap();
        assert_eq!(first, AppendOutcome { inserted: 1, duplicates: 0 });
        let second = store.append(vec![entry.clone()]).await.unwrap();
        assert_eq!(second, AppendOutcome { inserted: 0, duplicates: 1 });

        let feed = store.get_feed(subscriber, FeedPage::default()).await.unwrap();
        assert_eq!(feed, vec![entry]);
    }

    #[tokio::test]
    async fn test_feed_retention_keeps_newest() {
        let store = MemoryFeedStore::new(Some(2));
        let subscriber = address(0x51);
        let entries: Vec<_> = (1..=3u8)
            .map(|i| FeedEntry::new(subscriber, swap(0xee, 0x58, i as u64, i, 0)))
            .collect();
        store.append(entries.clone()).await.unwrap();

        assert_eq!(store.len(subscriber).await, 2);
        let feed = store.get_feed(subscriber, FeedPage::default()).await.unwrap();
        assert_eq!(feed, entries[1..].to_vec());
    }

    #[tokio::test]
    async fn test_evicted_entries_are_not_redelivered() {
        let store = MemoryFeedStore::new(Some(2));
        let subscriber = address(0x51);
        let entries: Vec<_> = (1..=3u8)
            .map(|i| FeedEntry::new(subscriber, swap(0xee, 0x58, i as u64, i, 0)))
            .collect();
        store.append(entries.clone()).await.unwrap();

        let replay = store.append(entries.clone()).await.unwrap();
        assert_eq!(replay, AppendOutcome { inserted: 0, duplicates: 3 });
        let feed = store.get_feed(subscriber, FeedPage::default()).await.unwrap();
        assert_eq!(feed, entries[1..].to_vec());
    }

    #[tokio::test]
    async fn test_feed_pagination() {
        let store = MemoryFeedStore::new(None);
        let subscriber = address(0x51);
        let entries: Vec<_> = (1..=5u8)
            .map(|i| FeedEntry::new(subscriber, swap(0xee, 0x58, i as u64, i, 0)))
            .collect();
        store.append(entries.clone()).await.unwrap();

        let page = store
            .get_feed(subscriber, FeedPage::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page, entries[1..3].to_vec());
        assert!(
            store
                .get_feed(address(0x99), FeedPage::default())
                .await
                .unwrap()
                .is_empty()
        );
    }
}
