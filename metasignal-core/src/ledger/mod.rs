//! Chain access.
//!
//! The pipeline only talks to the chain through [`LedgerReader`], and
//! through [`PairDirectory`] when pools are discovered from the factory.
//! The pool-quote endpoint additionally uses [`ReserveSource`]. All of them
//! are stateless and never retry: a failed call is reported to the caller,
//! which decides when to try again.

pub mod abi;
mod rpc;

pub use rpc::{FactoryDirectory, JsonRpcLedger};

use crate::pricing::Reserves;
use abi::IMetaPair;
use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by ledger adapters. All of them are treated as transient.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport error
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The node answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The node does not know the requested block (yet)
    #[error("block {0} not found")]
    BlockNotFound(u64),

    /// The node answered with something we cannot interpret
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A contract call returned data that does not match its ABI
    #[error("abi decoding failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),
}

/// Contract events the pipeline subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `Swapped(address indexed user, address inputToken, address outputToken,
    /// uint256 inputAmount, uint256 outputAmount)`
    Swapped,
}

impl EventKind {
    pub fn signature(&self) -> &'static str {
        match self {
            EventKind::Swapped => IMetaPair::Swapped::SIGNATURE,
        }
    }

    /// First log topic identifying the event.
    pub fn topic0(&self) -> B256 {
        match self {
            EventKind::Swapped => IMetaPair::Swapped::SIGNATURE_HASH,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Swapped => write!(f, "Swapped"),
        }
    }
}

/// A log as returned by the node, before decoding.
///
/// Positional fields are optional because nodes omit them for pending logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
    /// Set by the node when the log was dropped by a reorg.
    pub removed: bool,
}

#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Logs of `kind` emitted by `pool` in `from_block..=to_block`.
    async fn get_logs(
        &self,
        pool: Address,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, LedgerError>;

    /// Unix timestamp (seconds) of a block.
    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, LedgerError>;

    /// Latest block number known to the node.
    async fn get_chain_head(&self) -> Result<u64, LedgerError>;
}

#[async_trait]
pub trait ReserveSource: Send + Sync {
    /// Current reserves of a pair, in canonical token order.
    async fn get_reserves(&self, pool: Address) -> Result<Reserves, LedgerError>;
}

/// Pairs created by the factory, in creation order.
#[async_trait]
pub trait PairDirectory: Send + Sync {
    async fn pair_count(&self) -> Result<u64, LedgerError>;

    async fn pair_at(&self, index: u64) -> Result<Address, LedgerError>;

    /// The two assets of a pair, in the order the pair reports them.
    async fn pair_assets(&self, pair: Address) -> Result<[Address; 2], LedgerError>;
}
