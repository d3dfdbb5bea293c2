//! PoolSync processor.
//!
//! Brings one pool's feed deliveries up to a given chain head:
//!
//! 1. Load the pool cursor (a new pool starts at its first block)
//! 2. Fetch `Swapped` logs for the next block range
//! 3. Decode them, skipping malformed ones
//! 4. Resolve block timestamps
//! 5. Hand the batch to the [`FanoutDispatcher`]
//! 6. Advance the cursor to the end of the range
//!
//! Ranges wider than `max_block_range` are split into chunks and the cursor
//! advances after each one. Nothing is retried here: on error the cursor
//! stays where the last successful chunk left it.

use crate::config::SchedulerConfig;
use crate::entities::pool::Pool;
use crate::entities::swap_event::SwapLog;
use crate::ledger::{EventKind, LedgerError, LedgerReader};
use crate::processors::fanout::{FanoutDispatcher, SwapBatch};
use crate::store::{CursorStore, StoreError};
use alloy_primitives::Address;
use itertools::Itertools;
use kanau::processor::Processor;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that abort a pool sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading logs or block timestamps failed
    #[error("ledger fetch failed: {0}")]
    TransientFetch(#[from] LedgerError),

    /// Writing feed entries or the cursor failed
    #[error("dispatch write failed: {0}")]
    DispatchWrite(#[from] StoreError),

    /// The stored cursor could not be read
    #[error("cursor load failed: {0}")]
    CursorLoad(StoreError),
}

/// What a pool sync achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Blocks `from..=to` were processed and the cursor now sits at `to`.
    Advanced {
        from: u64,
        to: u64,
        delivered: u64,
        malformed: usize,
    },
    /// The cursor already covers the chain head.
    UpToDate { cursor: u64 },
}

#[derive(Debug, Default)]
struct ChunkStats {
    delivered: u64,
    malformed: usize,
}

pub struct PoolSync {
    ledger: Arc<dyn LedgerReader>,
    cursors: Arc<dyn CursorStore>,
    dispatcher: FanoutDispatcher,
    max_block_range: u64,
    initial_lookback: u64,
}

impl PoolSync {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        cursors: Arc<dyn CursorStore>,
        dispatcher: FanoutDispatcher,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            ledger,
            cursors,
            dispatcher,
            max_block_range: config.max_block_range.max(1),
            initial_lookback: config.initial_lookback,
        }
    }

    /// First block to process for a pool that was never synced.
    fn first_block(&self, pool: &Pool, head: u64) -> u64 {
        match pool.start_block {
            Some(start_block) => start_block,
            None => head.saturating_sub(self.initial_lookback) + 1,
        }
    }

    /// Process everything after the pool cursor up to and including `head`.
    pub async fn sync(&self, pool: &Pool, head: u64) -> Result<SyncOutcome, SyncError> {
        let stored = self
            .cursors
            .load(pool.address)
            .await
            .map_err(SyncError::CursorLoad)?;
        let from = match stored {
            Some(cursor) => cursor.saturating_add(1),
            None => self.first_block(pool, head),
        };

        if from > head {
            let cursor = from - 1;
            debug!(pool = %pool.address, cursor, head, "Pool is up to date");
            return Ok(SyncOutcome::UpToDate { cursor });
        }

        let mut stats = ChunkStats::default();
        let mut chunk_from = from;
        while chunk_from <= head {
            let chunk_to = head.min(chunk_from.saturating_add(self.max_block_range - 1));
            let chunk = self.sync_range(pool.address, chunk_from, chunk_to).await?;
            self.cursors.advance(pool.address, chunk_to).await?;
            stats.delivered += chunk.delivered;
            stats.malformed += chunk.malformed;
            chunk_from = chunk_to + 1;
        }

        Ok(SyncOutcome::Advanced {
            from,
            to: head,
            delivered: stats.delivered,
            malformed: stats.malformed,
        })
    }

    async fn sync_range(
        &self,
        pool: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<ChunkStats, SyncError> {
        debug!(%pool, from = from_block, to = to_block, "Fetching Swapped logs");
        let logs = self
            .ledger
            .get_logs(pool, EventKind::Swapped, from_block, to_block)
            .await?;

        let mut malformed = 0;
        let swaps = logs
            .iter()
            .filter_map(|log| match SwapLog::decode(pool, log) {
                Ok(swap) => Some(swap),
                Err(e) => {
                    malformed += 1;
                    warn!(
                        %pool,
                        block = ?log.block_number,
                        error = %e,
                        "Skipping malformed swap log, event is lost"
                    );
                    None
                }
            })
            .sorted_by_key(|swap| (swap.block_number, swap.log_index))
            .collect_vec();

        let mut timestamps: HashMap<u64, u64> = HashMap::new();
        let mut events = Vec::with_capacity(swaps.len());
        for swap in swaps {
            let timestamp = match timestamps.get(&swap.block_number).copied() {
                Some(timestamp) => timestamp,
                None => {
                    let timestamp = self.ledger.get_block_timestamp(swap.block_number).await?;
                    timestamps.insert(swap.block_number, timestamp);
                    timestamp
                }
            };
            events.push(swap.with_timestamp(timestamp));
        }

        let report = self.dispatcher.process(SwapBatch { pool, events }).await?;
        Ok(ChunkStats {
            delivered: report.delivered,
            malformed,
        })
    }
}
