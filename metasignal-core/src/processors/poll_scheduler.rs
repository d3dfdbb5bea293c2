//! PollScheduler processor.
//!
//! The PollScheduler is responsible for:
//! - Ticking on a fixed interval, skipping ticks it could not keep up with
//! - Reading the chain head once per tick
//! - Running a [`PoolSync`] for every registered pool, at most
//!   `max_concurrency` at a time
//! - Keeping pools isolated: one pool failing never stops the others
//!
//! The pool list lives in a [`ConfigStore`] so it can be swapped at runtime;
//! every tick works on a snapshot taken when the tick starts. With a
//! [`PoolDiscovery`] attached, new factory pairs are added to the list right
//! before that snapshot.

use crate::config::{ConfigStore, SchedulerConfig};
use crate::entities::pool::Pool;
use crate::ledger::{LedgerError, LedgerReader};
use crate::processors::fanout::FanoutDispatcher;
use crate::processors::pool_discovery::PoolDiscovery;
use crate::processors::pool_sync::{PoolSync, SyncError, SyncOutcome};
use crate::store::{CursorStore, FeedStore, FollowerIndex};
use alloy_primitives::Address;
use futures_util::StreamExt;
use futures_util::stream;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Result of one pool within a tick.
#[derive(Debug)]
pub enum PoolOutcome {
    Synced(SyncOutcome),
    Failed(SyncError),
}

/// Result of one tick.
#[derive(Debug)]
pub struct TickReport {
    /// Chain head every pool was synced up to.
    pub head: u64,
    /// One outcome per pool, in completion order.
    pub pools: Vec<(Address, PoolOutcome)>,
}

impl TickReport {
    pub fn outcome(&self, pool: Address) -> Option<&PoolOutcome> {
        self.pools
            .iter()
            .find(|(address, _)| *address == pool)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> usize {
        self.pools
            .iter()
            .filter(|(_, outcome)| matches!(outcome, PoolOutcome::Failed(_)))
            .count()
    }
}

pub struct PollScheduler {
    ledger: Arc<dyn LedgerReader>,
    sync: Arc<PoolSync>,
    discovery: Option<PoolDiscovery>,
    config: SchedulerConfig,
}

impl PollScheduler {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        cursors: Arc<dyn CursorStore>,
        followers: Arc<dyn FollowerIndex>,
        feeds: Arc<dyn FeedStore>,
        config: SchedulerConfig,
    ) -> Self {
        let dispatcher = FanoutDispatcher::new(followers, feeds);
        let sync = PoolSync::new(Arc::clone(&ledger), cursors, dispatcher, &config);
        Self {
            ledger,
            sync: Arc::new(sync),
            discovery: None,
            config,
        }
    }

    /// Refresh the pool list from the factory before every tick.
    pub fn with_discovery(mut self, discovery: PoolDiscovery) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Run one polling round over `pools`.
    ///
    /// Fails only when the chain head cannot be read, in which case no pool
    /// is touched.
    pub async fn tick(&self, pools: &[Pool]) -> Result<TickReport, LedgerError> {
        let head = self.ledger.get_chain_head().await?;
        let sync = Arc::clone(&self.sync);

        let outcomes = stream::iter(pools.to_vec())
            .map(move |pool| {
                let sync = Arc::clone(&sync);
                async move {
                    let outcome = match sync.sync(&pool, head).await {
                        Ok(outcome) => PoolOutcome::Synced(outcome),
                        Err(e) => {
                            error!(pool = %pool.address, head, error = %e, "Pool sync failed");
                            PoolOutcome::Failed(e)
                        }
                    };
                    (pool.address, outcome)
                }
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        Ok(TickReport {
            head,
            pools: outcomes,
        })
    }

    /// Discover new pools (if enabled), then tick over the current list.
    ///
    /// A discovery failure is logged and the tick runs on the list as it is.
    pub async fn round(&self, pools: &ConfigStore<Vec<Pool>>) -> Result<TickReport, LedgerError> {
        if let Some(discovery) = &self.discovery {
            match discovery.refresh(pools).await {
                Ok(0) => {}
                Ok(added) => info!(added, "Added discovered pools"),
                Err(e) => warn!(error = %e, "Pool discovery failed, keeping the current pool list"),
            }
        }
        let snapshot = pools.snapshot().await;
        self.tick(&snapshot).await
    }

    /// Tick until shutdown is signaled.
    ///
    /// A tick still in flight when shutdown arrives is dropped; cursors only
    /// move after a fully dispatched range, so the next start picks up from
    /// the last completed one.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>, pools: ConfigStore<Vec<Pool>>) {
        let mut pools_watcher = pools.subscribe();
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let pool_count = pools.read().await.len();
        info!(
            pools = pool_count,
            interval_secs = self.config.interval.as_secs(),
            max_concurrency = self.config.max_concurrency,
            discovery = self.discovery.is_some(),
            "PollScheduler started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown_requested(&mut shutdown_rx) => {
                    info!("PollScheduler received shutdown signal");
                    break;
                }

                Ok(version) = pools_watcher.changed() => {
                    let pool_count = pools.read().await.len();
                    info!(version, pools = pool_count, "Pool list changed");
                }

                _ = interval.tick() => {
                    tokio::select! {
                        biased;

                        _ = shutdown_requested(&mut shutdown_rx) => {
                            info!("PollScheduler abandoning tick on shutdown");
                            break;
                        }

                        report = self.round(&pools) => log_tick(report),
                    }
                }
            }
        }

        info!("PollScheduler shutdown complete");
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

fn log_tick(report: Result<TickReport, LedgerError>) {
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Failed to read chain head, skipping tick");
            return;
        }
    };

    for (pool, outcome) in &report.pools {
        if let PoolOutcome::Synced(SyncOutcome::Advanced {
            from,
            to,
            delivered,
            malformed,
        }) = outcome
        {
            if *delivered > 0 || *malformed > 0 {
                info!(%pool, from, to, delivered, malformed, "Pool advanced");
            } else {
                debug!(%pool, from, to, "Pool advanced");
            }
        }
    }
    debug!(
        head = report.head,
        pools = report.pools.len(),
        failures = report.failures(),
        "Tick completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{FeeRate, quote};
    use crate::store::memory::{MemoryCursorStore, MemoryFeedStore, MemoryFollowGraph};
    use crate::store::{FeedPage, FollowRegistry};
    use crate::testing::{ScriptedDirectory, ScriptedLedger, address, block_time, swap_log};
    use alloy_primitives::{B256, U256};
    use std::time::Duration;

    struct Harness {
        ledger: Arc<ScriptedLedger>,
        cursors: Arc<MemoryCursorStore>,
        feeds: Arc<MemoryFeedStore>,
        graph: Arc<MemoryFollowGraph>,
        scheduler: PollScheduler,
    }

    fn harness(head: u64, config: SchedulerConfig) -> Harness {
        let ledger = Arc::new(ScriptedLedger::new(head));
        let cursors = Arc::new(MemoryCursorStore::new());
        let feeds = Arc::new(MemoryFeedStore::new(None));
        let graph = Arc::new(MemoryFollowGraph::new());
        let scheduler = PollScheduler::new(
            ledger.clone(),
            cursors.clone(),
            graph.clone(),
            feeds.clone(),
            config,
        );
        Harness {
            ledger,
            cursors,
            feeds,
            graph,
            scheduler,
        }
    }

    fn pool(byte: u8) -> Pool {
        Pool::new(address(byte), address(0x0a), address(0x0b)).unwrap()
    }

    #[tokio::test]
    async fn test_failing_pool_does_not_block_others() {
        let h = harness(120, SchedulerConfig::default());
        let (p1, p2) = (pool(0xe1), pool(0xe2));
        h.cursors.advance(p1.address, 100).await.unwrap();
        h.cursors.advance(p2.address, 100).await.unwrap();
        h.ledger.fail_pool(p1.address, true);

        let report = h.scheduler.tick(&[p1.clone(), p2.clone()]).await.unwrap();

        assert_eq!(report.head, 120);
        assert_eq!(report.failures(), 1);
        assert!(matches!(
            report.outcome(p1.address),
            Some(PoolOutcome::Failed(SyncError::TransientFetch(_)))
        ));
        assert_eq!(h.cursors.load(p1.address).await.unwrap(), Some(100));
        assert_eq!(h.cursors.load(p2.address).await.unwrap(), Some(120));
    }

    #[tokio::test]
    async fn test_failed_pool_retries_same_range() {
        let h = harness(110, SchedulerConfig::default());
        let p = pool(0xe1);
        h.cursors.advance(p.address, 99).await.unwrap();

        h.ledger.fail_pool(p.address, true);
        h.scheduler.tick(std::slice::from_ref(&p)).await.unwrap();
        h.ledger.fail_pool(p.address, false);
        h.scheduler.tick(std::slice::from_ref(&p)).await.unwrap();

        assert_eq!(
            h.ledger.requests(),
            vec![(p.address, 100, 110), (p.address, 100, 110)]
        );
        assert_eq!(h.cursors.load(p.address).await.unwrap(), Some(110));
    }

    #[tokio::test]
    async fn test_head_failure_skips_tick() {
        let h = harness(110, SchedulerConfig::default());
        h.ledger.fail_head(true);

        assert!(h.scheduler.tick(&[pool(0xe1)]).await.is_err());
        assert!(h.ledger.requests().is_empty());
    }

    #[tokio::test]
    async fn test_up_to_date_pools_are_not_fetched() {
        let h = harness(110, SchedulerConfig::default());
        let p = pool(0xe1);
        h.cursors.advance(p.address, 110).await.unwrap();

        let report = h.scheduler.tick(std::slice::from_ref(&p)).await.unwrap();
        assert!(matches!(
            report.outcome(p.address),
            Some(PoolOutcome::Synced(SyncOutcome::UpToDate { cursor: 110 }))
        ));
        assert!(h.ledger.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let config = SchedulerConfig {
            max_concurrency: 2,
            ..SchedulerConfig::default()
        };
        let h = harness(50, config);
        h.ledger.delay_fetches(Duration::from_secs(1));
        let pools: Vec<_> = (0xe0..0xe7).map(pool).collect();

        let report = h.scheduler.tick(&pools).await.unwrap();

        assert_eq!(h.ledger.peak_in_flight(), 2);
        assert_eq!(report.pools.len(), pools.len());
        assert_eq!(report.failures(), 0);
        for p in &pools {
            assert_eq!(h.cursors.load(p.address).await.unwrap(), Some(50));
        }
    }

    #[tokio::test]
    async fn test_swap_reaches_follower_feed() {
        let h = harness(45, SchedulerConfig::default());
        let (subscriber, trader) = (address(0x51), address(0x58));
        let (token_a, token_b) = (address(0x0a), address(0x0b));
        let p = pool(0xee).with_start_block(40);

        h.graph.register(subscriber).await.unwrap();
        h.graph.follow(subscriber, trader).await.unwrap();

        let amount_out = quote(
            U256::from(50_000u64),
            U256::from(50_000u64),
            U256::from(500u64),
            FeeRate::DEFAULT,
        )
        .unwrap();
        let tx_hash: B256 = "0xabc0000000000000000000000000000000000000000000000000000000000000"
            .parse()
            .unwrap();
        let mut swap = swap_log(0xee, 0x58, 42, 0, 0);
        swap.token_in = token_a;
        swap.token_out = token_b;
        swap.amount_out = amount_out;
        swap.tx_hash = tx_hash;
        h.ledger.push_swap(&swap);

        let report = h.scheduler.tick(std::slice::from_ref(&p)).await.unwrap();
        assert!(matches!(
            report.outcome(p.address),
            Some(PoolOutcome::Synced(SyncOutcome::Advanced {
                from: 40,
                to: 45,
                delivered: 1,
                malformed: 0
            }))
        ));

        let feed = h
            .feeds
            .get_feed(subscriber, FeedPage::default())
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);
        let event = &feed[0].event;
        assert_eq!(event.tx_hash, tx_hash);
        assert_eq!(event.amount_in, U256::from(500u64));
        assert_eq!(event.amount_out, U256::from(493u64));
        assert_eq!(event.block_number, 42);
        assert_eq!(event.block_timestamp, block_time(42));
        assert_eq!(h.cursors.load(p.address).await.unwrap(), Some(45));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let config = SchedulerConfig {
            interval: Duration::from_secs(10),
            ..SchedulerConfig::default()
        };
        let h = harness(50, config);
        let p = pool(0xe1);
        let pools = ConfigStore::new(vec![p.clone()]);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(h.scheduler.run(shutdown_rx, pools.clone()));
        tokio::time::sleep(Duration::from_secs(25)).await;

        pools.update(vec![p.clone(), pool(0xe2)]).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(h.cursors.load(p.address).await.unwrap(), Some(50));
        assert_eq!(h.cursors.load(address(0xe2)).await.unwrap(), Some(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_in_flight_tick() {
        let h = harness(50, SchedulerConfig::default());
        h.ledger.delay_fetches(Duration::from_secs(5));
        let p = pool(0xe1);
        h.cursors.advance(p.address, 40).await.unwrap();
        let pools = ConfigStore::new(vec![p.clone()]);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(h.scheduler.run(shutdown_rx, pools));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.ledger.requests(), vec![(p.address, 41, 50)]);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(h.cursors.load(p.address).await.unwrap(), Some(40));
        let feed = h
            .feeds
            .get_feed(address(0x51), FeedPage::default())
            .await
            .unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_round_picks_up_factory_pairs() {
        let h = harness(50, SchedulerConfig::default());
        let directory = Arc::new(ScriptedDirectory::default());
        let scheduler = h
            .scheduler
            .with_discovery(PoolDiscovery::new(directory.clone()));
        let configured = pool(0xe0);
        let pools = ConfigStore::new(vec![configured.clone()]);

        directory.add_pair(address(0xe1), address(0x0b), address(0x0a));
        let report = scheduler.round(&pools).await.unwrap();
        assert_eq!(report.pools.len(), 2);
        assert_eq!(h.cursors.load(address(0xe1)).await.unwrap(), Some(50));

        directory.fail(true);
        let report = scheduler.round(&pools).await.unwrap();
        assert_eq!(report.pools.len(), 2);
        assert_eq!(report.failures(), 0);
    }
}
