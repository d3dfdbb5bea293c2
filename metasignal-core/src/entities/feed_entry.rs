use crate::entities::swap_event::SwapEvent;
use crate::framework::DatabaseProcessor;
use alloy_primitives::{Address, B256};
use kanau::processor::Processor;
use metasignal_sdk::objects::{FeedEvent, FeedEventKind};
use std::collections::HashSet;

/// A swap delivered into one subscriber's feed.
///
/// Each subscriber owns its copy; one swap followed by three subscribers
/// becomes three independent entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub subscriber: Address,
    pub event: SwapEvent,
}

/// Idempotency key of a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedKey {
    pub subscriber: Address,
    pub pool: Address,
    pub tx_hash: B256,
}

impl FeedEntry {
    pub fn new(subscriber: Address, event: SwapEvent) -> Self {
        Self { subscriber, event }
    }

    pub fn key(&self) -> FeedKey {
        FeedKey {
            subscriber: self.subscriber,
            pool: self.event.pool,
            tx_hash: self.event.tx_hash,
        }
    }
}

impl From<&FeedEntry> for FeedEvent {
    fn from(entry: &FeedEntry) -> Self {
        let event = &entry.event;
        FeedEvent {
            kind: FeedEventKind::Swap,
            pool: event.pool,
            actor: event.actor,
            token_in: event.token_in,
            token_out: event.token_out,
            amount_in: event.amount_in.to_string(),
            amount_out: event.amount_out.to_string(),
            block_number: event.block_number,
            timestamp: event.block_timestamp,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
        }
    }
}

/// A `feed_entries` row. Addresses and hashes are lowercase `0x` hex,
/// amounts base-10 text.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedEntryRow {
    pub subscriber: String,
    pub pool_address: String,
    pub actor: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: String,
    pub amount_out: String,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub tx_hash: String,
    pub log_index: i64,
}

/// Rows per statement. Each row binds [`FEED_ENTRY_BINDS`] parameters and
/// Postgres accepts at most 65535 per statement.
pub const FEED_INSERT_CHUNK: usize = 1_000;

/// Parameters bound per `feed_entries` row.
pub const FEED_ENTRY_BINDS: usize = 11;

/// `(subscriber, pool_address, tx_hash)` in DB form.
pub type FeedKeyRow = (String, String, String);

impl FeedEntryRow {
    pub fn key(&self) -> FeedKeyRow {
        (
            self.subscriber.clone(),
            self.pool_address.clone(),
            self.tx_hash.clone(),
        )
    }
}

#[derive(Debug, Clone)]
/// Insert multiple feed entries in one transaction.
///
/// Keys are claimed in `feed_keys` first; only rows whose key was not
/// claimed before are written to `feed_entries`, in the given order.
/// Returns the number of entries inserted.
pub struct InsertManyFeedEntries {
    pub entries: Vec<FeedEntryRow>,
}

impl Processor<InsertManyFeedEntries> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertManyFeedEntries")]
    async fn process(&self, insert: InsertManyFeedEntries) -> Result<u64, sqlx::Error> {
        if insert.entries.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let mut claimed = HashSet::new();
        for chunk in insert.entries.chunks(FEED_INSERT_CHUNK) {
            claimed.extend(FeedEntryRow::claim_keys_tx(&mut tx, chunk).await?);
        }
        let fresh = retain_claimed(insert.entries, claimed);

        let mut inserted = 0;
        for chunk in fresh.chunks(FEED_INSERT_CHUNK) {
            inserted += FeedEntryRow::insert_many_tx(&mut tx, chunk).await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

impl FeedEntryRow {
    /// Insert the keys of `rows` into `feed_keys` and return those that were
    /// not present yet.
    pub async fn claim_keys_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        rows: &[FeedEntryRow],
    ) -> Result<Vec<FeedKeyRow>, sqlx::Error> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder =
            sqlx::QueryBuilder::new("INSERT INTO feed_keys (subscriber, pool_address, tx_hash) ");
        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(&row.subscriber)
                .push_bind(&row.pool_address)
                .push_bind(&row.tx_hash);
        });
        query_builder.push(" ON CONFLICT DO NOTHING RETURNING subscriber, pool_address, tx_hash");

        query_builder
            .build_query_as::<FeedKeyRow>()
            .fetch_all(&mut **tx)
            .await
    }

    pub async fn insert_many_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        rows: &[FeedEntryRow],
    ) -> Result<u64, sqlx::Error> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut query_builder = sqlx::QueryBuilder::new(
            "INSERT INTO feed_entries \
            (subscriber, pool_address, actor, token_in, token_out, amount_in, amount_out, \
            block_number, block_timestamp, tx_hash, log_index) ",
        );
        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(&row.subscriber)
                .push_bind(&row.pool_address)
                .push_bind(&row.actor)
                .push_bind(&row.token_in)
                .push_bind(&row.token_out)
                .push_bind(&row.amount_in)
                .push_bind(&row.amount_out)
                .push_bind(row.block_number)
                .push_bind(row.block_timestamp)
                .push_bind(&row.tx_hash)
                .push_bind(row.log_index);
        });
        query_builder.push(" ON CONFLICT (subscriber, pool_address, tx_hash) DO NOTHING");

        let result = query_builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }
}

/// Keep the first row of every claimed key, in order.
fn retain_claimed(rows: Vec<FeedEntryRow>, mut claimed: HashSet<FeedKeyRow>) -> Vec<FeedEntryRow> {
    rows.into_iter()
        .filter(|row| claimed.remove(&row.key()))
        .collect()
}

#[derive(Debug, Clone)]
/// Get a page of a subscriber's feed in append order.
pub struct GetFeedPage {
    pub subscriber: String,
    pub offset: i64,
    pub limit: i64,
}

impl Processor<GetFeedPage> for DatabaseProcessor {
    type Output = Vec<FeedEntryRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetFeedPage")]
    async fn process(&self, query: GetFeedPage) -> Result<Vec<FeedEntryRow>, sqlx::Error> {
        sqlx::query_as::<_, FeedEntryRow>(
            r#"
            SELECT
                subscriber,
                pool_address,
                actor,
                token_in,
                token_out,
                amount_in,
                amount_out,
                block_number,
                block_timestamp,
                tx_hash,
                log_index
            FROM feed_entries
            WHERE subscriber = $1
            ORDER BY id ASC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(query.subscriber)
        .bind(query.offset)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Delete everything but the newest `keep` entries of each given subscriber.
///
/// Returns the number of rows deleted.
pub struct PruneFeeds {
    pub subscribers: Vec<String>,
    pub keep: i64,
}

impl Processor<PruneFeeds> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:PruneFeeds")]
    async fn process(&self, cmd: PruneFeeds) -> Result<u64, sqlx::Error> {
        if cmd.subscribers.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM feed_entries AS f
            USING (
                SELECT id
                FROM (
                    SELECT
                        id,
                        ROW_NUMBER() OVER (PARTITION BY subscriber ORDER BY id DESC) AS rank
                    FROM feed_entries
                    WHERE subscriber = ANY($1)
                ) AS ranked
                WHERE ranked.rank > $2
            ) AS stale
            WHERE f.id = stale.id
            "#,
        )
        .bind(&cmd.subscribers)
        .bind(cmd.keep)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
