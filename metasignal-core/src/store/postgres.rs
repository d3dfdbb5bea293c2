//! Postgres-backed stores.

use super::{
    AppendOutcome, CursorStore, FeedPage, FeedStore, FollowRegistry, FollowerIndex,
    RegistryError, StoreError, StoreHealth,
};
use crate::entities::cursor::{AdvancePoolCursor, GetPoolCursor};
use crate::entities::feed_entry::{
    FeedEntry, FeedEntryRow, GetFeedPage, InsertManyFeedEntries, PruneFeeds,
};
use crate::entities::follow::{
    DeleteFollow, GetFollowersOf, GetFollowsOf, InsertFollow, InsertSubscriber, SubscriberExists,
};
use crate::entities::swap_event::SwapEvent;
use crate::entities::{from_db_hex, parse_addresses, to_db_hex};
use crate::framework::{DatabaseProcessor, Ping};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use itertools::Itertools;
use kanau::processor::Processor;
use sqlx::PgPool;
use std::collections::BTreeSet;
use tracing::debug;

/// Every store port on top of one Postgres pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    processor: DatabaseProcessor,
    /// Newest entries kept per subscriber; `None` keeps everything.
    retain_latest: Option<usize>,
}

impl PgStore {
    pub fn new(pool: PgPool, retain_latest: Option<usize>) -> Self {
        Self {
            processor: DatabaseProcessor { pool },
            retain_latest,
        }
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{what} {value} exceeds i64")))
}

fn to_u64(value: i64, what: &str) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {what} {value}")))
}

fn parse_hex<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, StoreError> {
    from_db_hex(value).ok_or_else(|| StoreError::Corrupt(format!("invalid {what} {value:?}")))
}

fn parse_u256(value: &str, what: &str) -> Result<U256, StoreError> {
    U256::from_str_radix(value, 10)
        .map_err(|_| StoreError::Corrupt(format!("invalid {what} {value:?}")))
}

impl TryFrom<&FeedEntry> for FeedEntryRow {
    type Error = StoreError;

    fn try_from(entry: &FeedEntry) -> Result<Self, StoreError> {
        let event = &entry.event;
        Ok(FeedEntryRow {
            subscriber: to_db_hex(&entry.subscriber),
            pool_address: to_db_hex(&event.pool),
            actor: to_db_hex(&event.actor),
            token_in: to_db_hex(&event.token_in),
            token_out: to_db_hex(&event.token_out),
            amount_in: event.amount_in.to_string(),
            amount_out: event.amount_out.to_string(),
            block_number: to_i64(event.block_number, "block number")?,
            block_timestamp: to_i64(event.block_timestamp, "block timestamp")?,
            tx_hash: to_db_hex(&event.tx_hash),
            log_index: to_i64(event.log_index, "log index")?,
        })
    }
}

impl TryFrom<FeedEntryRow> for FeedEntry {
    type Error = StoreError;

    fn try_from(row: FeedEntryRow) -> Result<Self, StoreError> {
        Ok(FeedEntry {
            subscriber: parse_hex(&row.subscriber, "subscriber")?,
            event: SwapEvent {
                pool: parse_hex(&row.pool_address, "pool address")?,
                actor: parse_hex(&row.actor, "actor")?,
                token_in: parse_hex(&row.token_in, "token")?,
                token_out: parse_hex(&row.token_out, "token")?,
                amount_in: parse_u256(&row.amount_in, "amount")?,
                amount_out: parse_u256(&row.amount_out, "amount")?,
                block_number: to_u64(row.block_number, "block number")?,
                block_timestamp: to_u64(row.block_timestamp, "block timestamp")?,
                tx_hash: parse_hex(&row.tx_hash, "transaction hash")?,
                log_index: to_u64(row.log_index, "log index")?,
            },
        })
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.processor.process(Ping).await?)
    }
}

#[async_trait]
impl CursorStore for PgStore {
    async fn load(&self, pool: Address) -> Result<Option<u64>, StoreError> {
        let cursor = self
            .processor
            .process(GetPoolCursor {
                pool_address: to_db_hex(&pool),
            })
            .await?;
        cursor.map(|block| to_u64(block, "cursor")).transpose()
    }

    async fn advance(&self, pool: Address, block: u64) -> Result<u64, StoreError> {
        let stored = self
            .processor
            .process(AdvancePoolCursor {
                pool_address: to_db_hex(&pool),
                last_block: to_i64(block, "cursor")?,
            })
            .await?;
        to_u64(stored, "cursor")
    }
}

#[async_trait]
impl FollowerIndex for PgStore {
    async fn followers_of(&self, actor: Address) -> Result<BTreeSet<Address>, StoreError> {
        let rows = self
            .processor
            .process(GetFollowersOf {
                actor: to_db_hex(&actor),
            })
            .await?;
        rows.iter()
            .map(|row| parse_hex(row, "subscriber"))
            .collect()
    }
}

#[async_trait]
impl FeedStore for PgStore {
    async fn append(&self, entries: Vec<FeedEntry>) -> Result<AppendOutcome, StoreError> {
        let total = entries.len() as u64;
        let subscribers = entries
            .iter()
            .map(|entry| to_db_hex(&entry.subscriber))
            .unique()
            .collect_vec();
        let rows = entries
            .iter()
            .map(FeedEntryRow::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let inserted = self
            .processor
            .process(InsertManyFeedEntries { entries: rows })
            .await?;

        if let Some(keep) = self.retain_latest.filter(|_| inserted > 0) {
            let pruned = self
                .processor
                .process(PruneFeeds {
                    subscribers,
                    keep: to_i64(keep as u64, "retention")?,
                })
                .await?;
            if pruned > 0 {
                debug!(pruned, "Pruned feed entries beyond retention");
            }
        }

        Ok(AppendOutcome {
            inserted,
            duplicates: total.saturating_sub(inserted),
        })
    }

    async fn get_feed(
        &self,
        subscriber: Address,
        page: FeedPage,
    ) -> Result<Vec<FeedEntry>, StoreError> {
        let rows = self
            .processor
            .process(GetFeedPage {
                subscriber: to_db_hex(&subscriber),
                offset: to_i64(page.offset as u64, "offset")?,
                limit: to_i64(page.limit as u64, "limit")?,
            })
            .await?;
        rows.into_iter().map(FeedEntry::try_from).collect()
    }
}

impl PgStore {
    async fn ensure_registered(&self, subscriber: Address) -> Result<(), RegistryError> {
        let exists = self
            .processor
            .process(SubscriberExists {
                address: to_db_hex(&subscriber),
            })
            .await
            .map_err(StoreError::from)?;
        if !exists {
            return Err(RegistryError::NotRegistered(subscriber));
        }
        Ok(())
    }
}

#[async_trait]
impl FollowRegistry for PgStore {
    async fn register(&self, subscriber: Address) -> Result<bool, RegistryError> {
        let created = self
            .processor
            .process(InsertSubscriber {
                address: to_db_hex(&subscriber),
            })
            .await
            .map_err(StoreError::from)?;
        Ok(created)
    }

    async fn follow(
        &self,
        subscriber: Address,
        actor: Address,
    ) -> Result<Vec<Address>, RegistryError> {
        if subscriber == actor {
            return Err(RegistryError::SelfFollow);
        }
        self.ensure_registered(subscriber).await?;
        self.processor
            .process(InsertFollow {
                subscriber: to_db_hex(&subscriber),
                actor: to_db_hex(&actor),
            })
            .await
            .map_err(StoreError::from)?;
        self.follows(subscriber).await
    }

    async fn unfollow(
        &self,
        subscriber: Address,
        actor: Address,
    ) -> Result<Vec<Address>, RegistryError> {
        self.ensure_registered(subscriber).await?;
        self.processor
            .process(DeleteFollow {
                subscriber: to_db_hex(&subscriber),
                actor: to_db_hex(&actor),
            })
            .await
            .map_err(StoreError::from)?;
        self.follows(subscriber).await
    }

    async fn follows(&self, subscriber: Address) -> Result<Vec<Address>, RegistryError> {
        self.ensure_registered(subscriber).await?;
        let rows = self
            .processor
            .process(GetFollowsOf {
                subscriber: to_db_hex(&subscriber),
            })
            .await
            .map_err(StoreError::from)?;
        parse_addresses(&rows)
            .ok_or_else(|| StoreError::Corrupt("invalid followed address".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn test_feed_row_conversion() {
        let entry = FeedEntry::new(
            Address::with_last_byte(0x51),
            SwapEvent {
                pool: Address::with_last_byte(0xee),
                actor: Address::with_last_byte(0x58),
                token_in: Address::with_last_byte(0x0a),
                token_out: Address::with_last_byte(0x0b),
                amount_in: U256::from(10u64).pow(U256::from(30u64)),
                amount_out: U256::from(493u64),
                block_number: 42,
                block_timestamp: 1_700_000_000,
                tx_hash: B256::with_last_byte(0xab),
                log_index: 3,
            },
        );
        let row = FeedEntryRow::try_from(&entry).unwrap();
        assert_eq!(row.amount_in, format!("1{}", "0".repeat(30)));
        assert_eq!(row.subscriber, "0x0000000000000000000000000000000000000051");
        assert_eq!(FeedEntry::try_from(row).unwrap(), entry);
    }

    #[test]
    fn test_corrupt_row_is_rejected() {
        let row = FeedEntryRow {
            subscriber: "not-an-address".to_string(),
            pool_address: String::new(),
            actor: String::new(),
            token_in: String::new(),
            token_out: String::new(),
            amount_in: "1".to_string(),
            amount_out: "1".to_string(),
            block_number: 1,
            block_timestamp: 1,
            tx_hash: String::new(),
            log_index: 0,
        };
        assert!(matches!(
            FeedEntry::try_from(row),
            Err(StoreError::Corrupt(_))
        ));
        assert!(matches!(to_u64(-1, "cursor"), Err(StoreError::Corrupt(_))));
    }
}
