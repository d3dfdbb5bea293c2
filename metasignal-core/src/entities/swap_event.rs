use crate::ledger::RawLog;
use crate::ledger::abi::IMetaPair::Swapped;
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use thiserror::Error;

/// One executed trade, as observed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEvent {
    pub pool: Address,
    pub actor: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub block_number: u64,
    /// Unix timestamp (seconds) of the containing block.
    pub block_timestamp: u64,
    /// Natural idempotency key, together with the pool.
    pub tx_hash: B256,
    pub log_index: u64,
}

/// A decoded `Swapped` log whose block timestamp is not known yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLog {
    pub pool: Address,
    pub actor: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub amount_out: U256,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

impl SwapLog {
    pub fn with_timestamp(self, block_timestamp: u64) -> SwapEvent {
        SwapEvent {
            pool: self.pool,
            actor: self.actor,
            token_in: self.token_in,
            token_out: self.token_out,
            amount_in: self.amount_in,
            amount_out: self.amount_out,
            block_number: self.block_number,
            block_timestamp,
            tx_hash: self.tx_hash,
            log_index: self.log_index,
        }
    }
}

/// Why a log could not be turned into a [`SwapLog`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("log was removed by a reorg")]
    Removed,

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("emitted by {actual}, expected pool {expected}")]
    ForeignEmitter { expected: Address, actual: Address },

    #[error("unexpected event topic {0:?}")]
    UnexpectedTopic(Option<B256>),

    #[error("abi decoding failed: {0}")]
    Abi(String),
}

/// A log entry that cannot be decoded into a swap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed Swapped log (tx {tx_hash:?}, index {log_index:?}): {reason}")]
pub struct MalformedEvent {
    pub tx_hash: Option<B256>,
    pub log_index: Option<u64>,
    pub reason: MalformedReason,
}

impl SwapLog {
    /// Decode a `Swapped` log emitted by `pool`.
    pub fn decode(pool: Address, log: &RawLog) -> Result<SwapLog, MalformedEvent> {
        let malformed = |reason| MalformedEvent {
            tx_hash: log.transaction_hash,
            log_index: log.log_index,
            reason,
        };

        if log.removed {
            return Err(malformed(MalformedReason::Removed));
        }
        if log.address != pool {
            return Err(malformed(MalformedReason::ForeignEmitter {
                expected: pool,
                actual: log.address,
            }));
        }
        let topic0 = log.topics.first().copied();
        if topic0 != Some(Swapped::SIGNATURE_HASH) {
            return Err(malformed(MalformedReason::UnexpectedTopic(topic0)));
        }
        let swapped = Swapped::decode_raw_log_validate(log.topics.iter().copied(), &log.data)
            .map_err(|e| malformed(MalformedReason::Abi(e.to_string())))?;

        let block_number = log
            .block_number
            .ok_or(malformed(MalformedReason::MissingField("block number")))?;
        let tx_hash = log
            .transaction_hash
            .ok_or(malformed(MalformedReason::MissingField("transaction hash")))?;
        let log_index = log
            .log_index
            .ok_or(malformed(MalformedReason::MissingField("log index")))?;

        Ok(SwapLog {
            pool,
            actor: swapped.user,
            token_in: swapped.inputToken,
            token_out: swapped.outputToken,
            amount_in: swapped.inputAmount,
            amount_out: swapped.outputAmount,
            block_number,
            tx_hash,
            log_index,
        })
    }
}

/// Encode a swap as the pair contract would log it.
#[cfg(test)]
pub(crate) fn encode_swapped_log(swap: &SwapLog) -> RawLog {
    let log = Swapped {
        user: swap.actor,
        inputToken: swap.token_in,
        outputToken: swap.token_out,
        inputAmount: swap.amount_in,
        outputAmount: swap.amount_out,
    }
    .encode_log_data();
    RawLog {
        address: swap.pool,
        topics: log.topics().to_vec(),
        data: log.data,
        block_number: Some(swap.block_number),
        transaction_hash: Some(swap.tx_hash),
        log_index: Some(swap.log_index),
        removed: false,
    }
}
