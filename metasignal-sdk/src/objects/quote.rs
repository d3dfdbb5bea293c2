//! Quote API request and response types.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/quote`.
///
/// Reserves and the input amount are base-10 integer strings in the
/// token's smallest unit. The fee defaults to 997/1000 when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub input_reserve: String,
    pub output_reserve: String,
    pub input_amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_numerator: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_denominator: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub output_amount: String,
}

/// Query string of `GET /api/pools/{address}/quote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolQuoteQuery {
    pub token_in: Address,
    pub amount_in: String,
}

/// Quote computed against the pool's live reserves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolQuoteResponse {
    pub pool: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub input_reserve: String,
    pub output_reserve: String,
    pub amount_out: String,
}
