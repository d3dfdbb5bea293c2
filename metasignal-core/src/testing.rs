//! Fakes shared by the unit tests of this crate.

use crate::entities::feed_entry::FeedEntry;
use crate::entities::swap_event::{SwapEvent, SwapLog, encode_swapped_log};
use crate::ledger::{EventKind, LedgerError, LedgerReader, PairDirectory, RawLog};
use crate::store::memory::MemoryFeedStore;
use crate::store::{AppendOutcome, FeedPage, FeedStore, StoreError};
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

pub fn address(byte: u8) -> Address {
    Address::with_last_byte(byte)
}

pub fn tx(byte: u8) -> B256 {
    B256::with_last_byte(byte)
}

/// Timestamp the scripted ledger reports for `block_number`.
pub fn block_time(block_number: u64) -> u64 {
    GENESIS_TIMESTAMP + block_number * 12
}

/// A swap of 500 units of token `0x0a` for 493 units of token `0x0b`.
pub fn swap_log(pool: u8, actor: u8, block_number: u64, tx_byte: u8, log_index: u64) -> SwapLog {
    SwapLog {
        pool: address(pool),
        actor: address(actor),
        token_in: address(0x0a),
        token_out: address(0x0b),
        amount_in: U256::from(500u64),
        amount_out: U256::from(493u64),
        block_number,
        tx_hash: tx(tx_byte),
        log_index,
    }
}

pub fn swap(pool: u8, actor: u8, block_number: u64, tx_byte: u8, log_index: u64) -> SwapEvent {
    swap_log(pool, actor, block_number, tx_byte, log_index).with_timestamp(block_time(block_number))
}

#[derive(Debug, Default)]
struct LedgerScript {
    head: u64,
    head_fails: bool,
    logs: HashMap<Address, Vec<RawLog>>,
    failing_pools: HashSet<Address>,
    requests: Vec<(Address, u64, u64)>,
    fetch_delay: Option<Duration>,
}

/// In-memory chain whose contents and failures are set by the test.
#[derive(Debug, Default)]
pub struct ScriptedLedger {
    script: Mutex<LedgerScript>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedLedger {
    pub fn new(head: u64) -> Self {
        let ledger = Self::default();
        ledger.set_head(head);
        ledger
    }

    pub fn set_head(&self, head: u64) {
        self.script.lock().unwrap().head = head;
    }

    pub fn fail_head(&self, fail: bool) {
        self.script.lock().unwrap().head_fails = fail;
    }

    pub fn push_log(&self, log: RawLog) {
        let mut script = self.script.lock().unwrap();
        script.logs.entry(log.address).or_default().push(log);
    }

    pub fn push_swap(&self, swap: &SwapLog) {
        self.push_log(encode_swapped_log(swap));
    }

    /// Make every `get_logs` call for `pool` fail (or succeed again).
    pub fn fail_pool(&self, pool: Address, fail: bool) {
        let mut script = self.script.lock().unwrap();
        if fail {
            script.failing_pools.insert(pool);
        } else {
            script.failing_pools.remove(&pool);
        }
    }

    /// Make every `get_logs` call take `delay` before answering.
    pub fn delay_fetches(&self, delay: Duration) {
        self.script.lock().unwrap().fetch_delay = Some(delay);
    }

    /// Most `get_logs` calls that were waiting at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every `(pool, from, to)` passed to `get_logs` so far.
    pub fn requests(&self) -> Vec<(Address, u64, u64)> {
        self.script.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl LedgerReader for ScriptedLedger {
    async fn get_logs(
        &self,
        pool: Address,
        _kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, LedgerError> {
        let (result, delay) = {
            let mut script = self.script.lock().unwrap();
            script.requests.push((pool, from_block, to_block));
            let result = if script.failing_pools.contains(&pool) {
                Err(LedgerError::Rpc {
                    code: -32000,
                    message: "scripted failure".to_string(),
                })
            } else {
                Ok(script
                    .logs
                    .get(&pool)
                    .map(|logs| {
                        logs.iter()
                            .filter(|log| {
                                log.block_number
                                    .is_none_or(|block| (from_block..=to_block).contains(&block))
                            })
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default())
            };
            (result, script.fetch_delay)
        };

        if let Some(delay) = delay {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        result
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, LedgerError> {
        if block_number > self.script.lock().unwrap().head {
            return Err(LedgerError::BlockNotFound(block_number));
        }
        Ok(block_time(block_number))
    }

    async fn get_chain_head(&self) -> Result<u64, LedgerError> {
        let script = self.script.lock().unwrap();
        if script.head_fails {
            return Err(LedgerError::Decode("scripted head failure".to_string()));
        }
        Ok(script.head)
    }
}

/// Factory whose pairs are added by the test.
#[derive(Debug, Default)]
pub struct ScriptedDirectory {
    pairs: Mutex<Vec<(Address, [Address; 2])>>,
    failing: AtomicBool,
}

impl ScriptedDirectory {
    pub fn add_pair(&self, pair: Address, asset_a: Address, asset_b: Address) {
        self.pairs.lock().unwrap().push((pair, [asset_a, asset_b]));
    }

    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Decode("scripted factory failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PairDirectory for ScriptedDirectory {
    async fn pair_count(&self) -> Result<u64, LedgerError> {
        self.check()?;
        Ok(self.pairs.lock().unwrap().len() as u64)
    }

    async fn pair_at(&self, index: u64) -> Result<Address, LedgerError> {
        self.check()?;
        let pairs = self.pairs.lock().unwrap();
        pairs
            .get(index as usize)
            .map(|(pair, _)| *pair)
            .ok_or_else(|| LedgerError::Decode(format!("no pair at index {index}")))
    }

    async fn pair_assets(&self, pair: Address) -> Result<[Address; 2], LedgerError> {
        self.check()?;
        let pairs = self.pairs.lock().unwrap();
        pairs
            .iter()
            .find(|(address, _)| *address == pair)
            .map(|(_, assets)| *assets)
            .ok_or_else(|| LedgerError::Decode(format!("unknown pair {pair}")))
    }
}

/// A [`MemoryFeedStore`] whose writes can be switched off.
#[derive(Debug, Default)]
pub struct FailingFeedStore {
    pub inner: MemoryFeedStore,
    failing: AtomicBool,
}

impl FailingFeedStore {
    pub fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedStore for FailingFeedStore {
    async fn append(&self, entries: Vec<FeedEntry>) -> Result<AppendOutcome, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("scripted write failure".to_string()));
        }
        self.inner.append(entries).await
    }

    async fn get_feed(
        &self,
        subscriber: Address,
        page: FeedPage,
    ) -> Result<Vec<FeedEntry>, StoreError> {
        self.inner.get_feed(subscriber, page).await
    }
}
