//! Swap quotes.

use alloy_primitives::Address;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use metasignal_core::ledger::LedgerError;
use metasignal_core::pricing::{self, FeeRate, PricingError};
use metasignal_sdk::objects::{PoolQuoteQuery, PoolQuoteResponse, QuoteRequest, QuoteResponse};

use super::error_response;
use crate::state::AppState;

#[derive(Debug)]
pub(super) enum QuoteApiError {
    /// The inputs cannot be priced.
    Pricing(PricingError),
    /// The pool is not registered.
    UnknownPool(Address),
    /// Reserves could not be read from the chain.
    Ledger(LedgerError),
}

impl From<PricingError> for QuoteApiError {
    fn from(e: PricingError) -> Self {
        Self::Pricing(e)
    }
}

impl IntoResponse for QuoteApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            QuoteApiError::Pricing(e) => error_response(StatusCode::BAD_REQUEST, e),
            QuoteApiError::UnknownPool(pool) => {
                error_response(StatusCode::NOT_FOUND, format!("pool {pool} is not registered"))
            }
            QuoteApiError::Ledger(e) => {
                tracing::error!(error = %e, "Failed to read pool reserves");
                error_response(StatusCode::BAD_GATEWAY, "failed to read pool reserves")
            }
        }
    }
}

/// `POST /quote`: price a swap against caller-supplied reserves.
///
/// The configured fee applies unless the request carries both fee fields.
pub(super) async fn quote(
    state: State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, QuoteApiError> {
    let fee = match (request.fee_numerator, request.fee_denominator) {
        (Some(numerator), Some(denominator)) => FeeRate::new(numerator, denominator)?,
        (None, None) => state.fee,
        (numerator, denominator) => {
            return Err(PricingError::InvalidFee {
                numerator: numerator.unwrap_or(0),
                denominator: denominator.unwrap_or(0),
            }
            .into());
        }
    };

    let output_amount = pricing::quote(
        pricing::parse_reserve(&request.input_reserve)?,
        pricing::parse_reserve(&request.output_reserve)?,
        pricing::parse_amount(&request.input_amount)?,
        fee,
    )?;

    Ok(Json(QuoteResponse {
        output_amount: output_amount.to_string(),
    }))
}

/// `GET /pools/{address}/quote?token_in=&amount_in=`: price a swap against
/// the pool's current on-chain reserves.
pub(super) async fn pool_quote(
    state: State<AppState>,
    Path(address): Path<Address>,
    Query(query): Query<PoolQuoteQuery>,
) -> Result<Json<PoolQuoteResponse>, QuoteApiError> {
    let pool = state
        .pool(address)
        .await
        .ok_or(QuoteApiError::UnknownPool(address))?;
    let amount_in = pricing::parse_amount(&query.amount_in)?;
    if !pool.contains(query.token_in) {
        return Err(PricingError::UnknownAsset {
            pool: address,
            token: query.token_in,
        }
        .into());
    }

    let reserves = state
        .reserves
        .get_reserves(address)
        .await
        .map_err(QuoteApiError::Ledger)?;
    let quote = pricing::quote_pool(&pool, reserves, query.token_in, amount_in, state.fee)?;

    Ok(Json(PoolQuoteResponse {
        pool: address,
        token_in: quote.token_in,
        token_out: quote.token_out,
        input_reserve: quote.input_reserve.to_string(),
        output_reserve: quote.output_reserve.to_string(),
        amount_out: quote.amount_out.to_string(),
    }))
}
