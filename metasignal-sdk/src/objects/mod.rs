pub mod feed;
pub mod quote;
pub mod registration;

pub use feed::{FeedEvent, FeedEventKind, FeedQuery, FeedResponse};
pub use quote::{PoolQuoteQuery, PoolQuoteResponse, QuoteRequest, QuoteResponse};
pub use registration::{
    FollowRequest, FollowResponse, FollowsQuery, RegisterRequest, RegisterResponse,
};

/// Error body returned by every endpoint on failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
