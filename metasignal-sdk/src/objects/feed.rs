//! Feed API request and response types.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedEventKind {
    Swap,
}

/// One entry of a subscriber's feed.
///
/// Token amounts are base-10 strings in the token's smallest unit, so
/// consumers never lose precision to a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
    #[serde(rename = "type")]
    pub kind: FeedEventKind,
    pub pool: Address,
    pub actor: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: String,
    pub amount_out: String,
    pub block_number: u64,
    /// Unix timestamp (seconds) of the block containing the swap.
    pub timestamp: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// Query string of `GET /api/feed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedQuery {
    pub address: Address,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Ordered feed, oldest entry first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResponse {
    pub events: Vec<FeedEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_event_wire_format() {
        let event = FeedEvent {
            kind: FeedEventKind::Swap,
            pool: Address::repeat_byte(0x01),
            actor: Address::repeat_byte(0x02),
            token_in: Address::repeat_byte(0x03),
            token_out: Address::repeat_byte(0x04),
            amount_in: "500".to_string(),
            amount_out: "493".to_string(),
            block_number: 42,
            timestamp: 1_700_000_000,
            tx_hash: B256::repeat_byte(0xab),
            log_index: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "swap");
        assert_eq!(json["amount_in"], "500");
        assert_eq!(json["block_number"], 42);

        let parsed: FeedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_feed_query_accepts_lowercase_address() {
        let query: FeedQuery = serde_json::from_str(
            r#"{"address":"0x00000000000000000000000000000000000000aa"}"#,
        )
        .unwrap();
        assert_eq!(query.address, Address::with_last_byte(0xaa));
        assert_eq!(query.offset, None);
        assert_eq!(query.limit, None);
    }
}
