//! Ethereum JSON-RPC ledger adapter.

use super::abi::{IMetaFactory, IMetaPair};
use super::{EventKind, LedgerError, LedgerReader, PairDirectory, RawLog, ReserveSource};
use crate::pricing::Reserves;
use alloy_primitives::{Address, B256, Bytes, U64, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// [`LedgerReader`] and [`ReserveSource`] backed by a node's HTTP JSON-RPC
/// endpoint (`eth_getLogs`, `eth_getBlockByNumber`, `eth_blockNumber`,
/// `eth_call`).
pub struct JsonRpcLedger {
    rpc_url: Url,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcLedger {
    /// Create a new JsonRpcLedger.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - HTTP(S) JSON-RPC endpoint of the node
    /// * `timeout` - Per-request timeout
    pub fn new(rpc_url: Url, timeout: Duration) -> Self {
        Self {
            rpc_url,
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Perform one JSON-RPC call. `Ok(None)` means the node returned a
    /// `null` result.
    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<Option<R>, LedgerError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        #[derive(Serialize)]
        struct RpcRequest<'a, P> {
            jsonrpc: &'static str,
            id: u64,
            method: &'a str,
            params: P,
        }

        #[derive(serde::Deserialize)]
        struct RpcResponse<R> {
            result: Option<R>,
            #[serde(default)]
            error: Option<RpcErrorObject>,
        }

        #[derive(serde::Deserialize)]
        struct RpcErrorObject {
            code: i64,
            message: String,
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "JSON-RPC request");

        let response = self
            .http_client
            .post(self.rpc_url.clone())
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await?
            .error_for_status()?;
        let response: RpcResponse<R> = response.json().await?;

        if let Some(error) = response.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    /// `eth_call` a view function at the latest block.
    async fn eth_call<C>(&self, to: Address, call: C) -> Result<C::Return, LedgerError>
    where
        C: SolCall + Send,
    {
        let request = serde_json::json!({
            "to": to,
            "data": Bytes::from(call.abi_encode()),
        });
        let output: Option<Bytes> = self.call("eth_call", (request, "latest")).await?;
        Ok(C::abi_decode_returns(&output.unwrap_or_default())?)
    }
}

#[async_trait]
impl LedgerReader for JsonRpcLedger {
    async fn get_logs(
        &self,
        pool: Address,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, LedgerError> {
        let filter = serde_json::json!({
            "address": pool,
            "topics": [kind.topic0()],
            "fromBlock": format!("{from_block:#x}"),
            "toBlock": format!("{to_block:#x}"),
        });
        let logs: Option<Vec<RpcLog>> = self.call("eth_getLogs", [filter]).await?;
        Ok(logs
            .unwrap_or_default()
            .into_iter()
            .map(RawLog::from)
            .collect())
    }

    async fn get_block_timestamp(&self, block_number: u64) -> Result<u64, LedgerError> {
        #[derive(serde::Deserialize)]
        struct RpcBlockHeader {
            timestamp: U64,
        }

        let block: Option<RpcBlockHeader> = self
            .call(
                "eth_getBlockByNumber",
                (format!("{block_number:#x}"), false),
            )
            .await?;
        block
            .map(|b| b.timestamp.to::<u64>())
            .ok_or(LedgerError::BlockNotFound(block_number))
    }

    async fn get_chain_head(&self) -> Result<u64, LedgerError> {
        let head: Option<U64> = self.call("eth_blockNumber", [(); 0]).await?;
        head.map(|h| h.to::<u64>())
            .ok_or_else(|| LedgerError::Decode("eth_blockNumber returned null".to_string()))
    }
}

#[async_trait]
impl ReserveSource for JsonRpcLedger {
    async fn get_reserves(&self, pool: Address) -> Result<Reserves, LedgerError> {
        let reserves = self.eth_call(pool, IMetaPair::getReservesCall {}).await?;
        Ok(Reserves {
            reserve0: reserves.reserveA,
            reserve1: reserves.reserveB,
        })
    }
}

/// [`PairDirectory`] reading the factory contract through a
/// [`JsonRpcLedger`].
pub struct FactoryDirectory {
    ledger: Arc<JsonRpcLedger>,
    factory: Address,
}

impl FactoryDirectory {
    pub fn new(ledger: Arc<JsonRpcLedger>, factory: Address) -> Self {
        Self { ledger, factory }
    }
}

#[async_trait]
impl PairDirectory for FactoryDirectory {
    async fn pair_count(&self) -> Result<u64, LedgerError> {
        let count: U256 = self
            .ledger
            .eth_call(self.factory, IMetaFactory::allPairsLengthCall {})
            .await?;
        u64::try_from(count)
            .map_err(|_| LedgerError::Decode(format!("allPairsLength {count} out of range")))
    }

    async fn pair_at(&self, index: u64) -> Result<Address, LedgerError> {
        self.ledger
            .eth_call(
                self.factory,
                IMetaFactory::allPairsCall {
                    index: U256::from(index),
                },
            )
            .await
    }

    async fn pair_assets(&self, pair: Address) -> Result<[Address; 2], LedgerError> {
        let token_a = self.ledger.eth_call(pair, IMetaPair::tokenACall {}).await?;
        let token_b = self.ledger.eth_call(pair, IMetaPair::tokenBCall {}).await?;
        Ok([token_a, token_b])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    #[serde(default)]
    block_number: Option<U64>,
    #[serde(default)]
    transaction_hash: Option<B256>,
    #[serde(default)]
    log_index: Option<U64>,
    #[serde(default)]
    removed: bool,
}

impl From<RpcLog> for RawLog {
    fn from(log: RpcLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_number: log.block_number.map(|n| n.to::<u64>()),
            transaction_hash: log.transaction_hash,
            log_index: log.log_index.map(|n| n.to::<u64>()),
            removed: log.removed,
        }
    }
}
