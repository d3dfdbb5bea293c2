//! Constant-product swap pricing.
//!
//! The fee is taken from the input leg:
//!
//! ```text
//! effective_input = input_amount * fee_numerator
//! output_amount   = effective_input * output_reserve
//!                 / (input_reserve * fee_denominator + effective_input)
//! ```
//!
//! All arithmetic is done on `U256` in the token's smallest unit and the
//! final division truncates, matching the pair contract's integer division.
//! Nothing here performs I/O or touches shared state.

use crate::entities::pool::Pool;
use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("reserves must both be greater than zero")]
    InvalidReserves,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid fee rate {numerator}/{denominator}")]
    InvalidFee { numerator: u64, denominator: u64 },

    #[error("arithmetic overflow while computing quote")]
    Overflow,

    #[error("token {token} is not an asset of pool {pool}")]
    UnknownAsset { pool: Address, token: Address },
}

/// Fraction of the input amount that takes part in the swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeRate {
    numerator: u64,
    denominator: u64,
}

impl FeeRate {
    /// 0.3% fee.
    pub const DEFAULT: FeeRate = FeeRate {
        numerator: 997,
        denominator: 1000,
    };

    pub fn new(numerator: u64, denominator: u64) -> Result<Self, PricingError> {
        if denominator == 0 || numerator > denominator {
            return Err(PricingError::InvalidFee {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Expected output of swapping `input_amount` into a pool holding
/// `input_reserve` of the input asset and `output_reserve` of the output one.
pub fn quote(
    input_reserve: U256,
    output_reserve: U256,
    input_amount: U256,
    fee: FeeRate,
) -> Result<U256, PricingError> {
    if input_reserve.is_zero() || output_reserve.is_zero() {
        return Err(PricingError::InvalidReserves);
    }

    let effective_input = input_amount
        .checked_mul(U256::from(fee.numerator))
        .ok_or(PricingError::Overflow)?;
    let numerator = effective_input
        .checked_mul(output_reserve)
        .ok_or(PricingError::Overflow)?;
    let denominator = input_reserve
        .checked_mul(U256::from(fee.denominator))
        .and_then(|scaled| scaled.checked_add(effective_input))
        .ok_or(PricingError::Overflow)?;

    numerator
        .checked_div(denominator)
        .ok_or(PricingError::InvalidReserves)
}

/// Parse a base-10 token amount. Negative, fractional or hex input is rejected.
pub fn parse_amount(value: &str) -> Result<U256, PricingError> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PricingError::InvalidAmount(value.to_string()));
    }
    U256::from_str_radix(value, 10).map_err(|_| PricingError::InvalidAmount(value.to_string()))
}

/// Parse a base-10 reserve. Anything that is not a positive integer fails
/// with [`PricingError::InvalidReserves`].
pub fn parse_reserve(value: &str) -> Result<U256, PricingError> {
    match parse_amount(value) {
        Ok(reserve) if !reserve.is_zero() => Ok(reserve),
        _ => Err(PricingError::InvalidReserves),
    }
}

/// Pool reserves in canonical token order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserves {
    /// Reserve of [`Pool::token0`].
    pub reserve0: U256,
    /// Reserve of [`Pool::token1`].
    pub reserve1: U256,
}

impl Reserves {
    /// `(input_reserve, output_reserve)` for a swap paying in `token_in`.
    pub fn oriented(&self, pool: &Pool, token_in: Address) -> Result<(U256, U256), PricingError> {
        if token_in == pool.token0() {
            Ok((self.reserve0, self.reserve1))
        } else if token_in == pool.token1() {
            Ok((self.reserve1, self.reserve0))
        } else {
            Err(PricingError::UnknownAsset {
                pool: pool.address,
                token: token_in,
            })
        }
    }
}

/// Result of [`quote_pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolQuote {
    pub token_in: Address,
    pub token_out: Address,
    pub input_reserve: U256,
    pub output_reserve: U256,
    pub amount_out: U256,
}

/// Quote a swap against a pool's reserves, orienting them by `token_in`.
pub fn quote_pool(
    pool: &Pool,
    reserves: Reserves,
    token_in: Address,
    amount_in: U256,
    fee: FeeRate,
) -> Result<PoolQuote, PricingError> {
    let (input_reserve, output_reserve) = reserves.oriented(pool, token_in)?;
    let token_out = pool
        .counterpart(token_in)
        .ok_or(PricingError::UnknownAsset {
            pool: pool.address,
            token: token_in,
        })?;
    let amount_out = quote(input_reserve, output_reserve, amount_in, fee)?;
    Ok(PoolQuote {
        token_in,
        token_out,
        input_reserve,
        output_reserve,
        amount_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    #[test]
    fn test_quote_exact_integer_result() {
        // 997000 * 200000 / (100000 * 1000 + 997000) = 1974.3..
        let out = quote(u(100_000), u(200_000), u(1_000), FeeRate::DEFAULT).unwrap();
        assert_eq!(out, u(1974));
        // Same inputs, same answer.
        assert_eq!(
            quote(u(100_000), u(200_000), u(1_000), FeeRate::DEFAULT).unwrap(),
            out
        );
    }

    #[test]
    fn test_quote_balanced_pool() {
        let out = quote(u(50_000), u(50_000), u(500), FeeRate::DEFAULT).unwrap();
        assert_eq!(out, u(493));
    }

    #[test]
    fn test_quote_zero_input() {
        assert_eq!(
            quote(u(10), u(10), U256::ZERO, FeeRate::DEFAULT).unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn test_quote_monotonic_and_bounded() {
        let reserves = [(1u64, 1u64), (1_000, 3), (100_000, 200_000), (7, 1_000_000)];
        for (input_reserve, output_reserve) in reserves {
            let mut previous = U256::ZERO;
            for amount in (0u64..5_000).step_by(37).chain([u64::MAX / 2_000]) {
                let out = quote(
                    u(input_reserve),
                    u(output_reserve),
                    u(amount),
                    FeeRate::DEFAULT,
                )
                .unwrap();
                assert!(out >= previous, "quote decreased at amount {amount}");
                assert!(out < u(output_reserve), "quote drained reserve at {amount}");
                previous = out;
            }
        }
    }

    #[test]
    fn test_quote_large_reserves() {
        // 18-decimal tokens with a billion units on each side.
        let reserve = U256::from(10u64).pow(u(27));
        let amount = U256::from(10u64).pow(u(18));
        let out = quote(reserve, reserve, amount, FeeRate::DEFAULT).unwrap();
        assert!(out < amount);
        assert!(out > amount * u(99) / u(100));
    }

    #[test]
    fn test_quote_overflow_is_reported() {
        let out = quote(u(1), U256::MAX, U256::MAX, FeeRate::DEFAULT);
        assert_eq!(out, Err(PricingError::Overflow));
    }

    #[test]
    fn test_quote_rejects_empty_reserves() {
        assert_eq!(
            quote(U256::ZERO, u(10), u(1), FeeRate::DEFAULT),
            Err(PricingError::InvalidReserves)
        );
        assert_eq!(
            quote(u(10), U256::ZERO, u(1), FeeRate::DEFAULT),
            Err(PricingError::InvalidReserves)
        );
    }

    #[test]
    fn test_fee_rate_validation() {
        assert!(FeeRate::new(997, 1000).is_ok());
        assert!(FeeRate::new(1000, 1000).is_ok());
        assert_eq!(
            FeeRate::new(1, 0),
            Err(PricingError::InvalidFee {
                numerator: 1,
                denominator: 0
            })
        );
        assert!(FeeRate::new(1001, 1000).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("500").unwrap(), u(500));
        assert_eq!(parse_amount(" 0 ").unwrap(), U256::ZERO);
        assert!(matches!(parse_amount("-5"), Err(PricingError::InvalidAmount(_))));
        assert!(matches!(parse_amount("1.5"), Err(PricingError::InvalidAmount(_))));
        assert!(matches!(parse_amount("0x10"), Err(PricingError::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(PricingError::InvalidAmount(_))));
        assert_eq!(parse_reserve("0"), Err(PricingError::InvalidReserves));
        assert_eq!(parse_reserve("-1"), Err(PricingError::InvalidReserves));
    }

    #[test]
    fn test_reserves_follow_canonical_order() {
        let token_a = Address::with_last_byte(0x0a);
        let token_b = Address::with_last_byte(0x0b);
        let pool = Pool::new(Address::with_last_byte(0xee), token_b, token_a).unwrap();
        let reserves = Reserves {
            reserve0: u(100_000),
            reserve1: u(200_000),
        };

        assert_eq!(reserves.oriented(&pool, token_a).unwrap(), (u(100_000), u(200_000)));
        assert_eq!(reserves.oriented(&pool, token_b).unwrap(), (u(200_000), u(100_000)));

        let q = quote_pool(&pool, reserves, token_a, u(1_000), FeeRate::DEFAULT).unwrap();
        assert_eq!(q.token_out, token_b);
        assert_eq!(q.amount_out, u(1974));

        let stranger = Address::with_last_byte(0x0c);
        assert_eq!(
            quote_pool(&pool, reserves, stranger, u(1), FeeRate::DEFAULT),
            Err(PricingError::UnknownAsset {
                pool: pool.address,
                token: stranger
            })
        );
    }
}
