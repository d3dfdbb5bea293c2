pub mod cursor;
pub mod feed_entry;
pub mod follow;
pub mod pool;
pub mod swap_event;

use alloy_primitives::Address;
use std::fmt::LowerHex;
use std::str::FromStr;

/// Database text form of addresses and hashes: lowercase, `0x`-prefixed.
pub fn to_db_hex<T: LowerHex>(value: &T) -> String {
    format!("{value:#x}")
}

/// Parse an address or hash stored by [`to_db_hex`].
pub fn from_db_hex<T: FromStr>(value: &str) -> Option<T> {
    value.parse().ok()
}

/// Parse a stored address list. `None` if any entry is not an address.
pub fn parse_addresses(values: &[String]) -> Option<Vec<Address>> {
    values.iter().map(|v| from_db_hex(v)).collect()
}
