//! Subscriber registration and follow graph types.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub address: Address,
    /// `false` when the address was already registered.
    pub created: bool,
}

/// Body of `POST /api/follow` and `POST /api/unfollow`.
///
/// `address` is the subscriber, `follow` the actor being (un)followed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowRequest {
    pub address: Address,
    pub follow: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowResponse {
    pub success: bool,
    pub follows: Vec<Address>,
}

/// Query string of `GET /api/follows`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowsQuery {
    pub address: Address,
}
