use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("pool {0} must hold two distinct assets")]
    IdenticalAssets(Address),
}

/// A registered trading pair contract.
///
/// The two assets are kept in canonical order (`token0 < token1`, byte-wise,
/// which is the same as comparing lowercase hex strings). Everything that
/// reads reserves relies on this order to decide which side is which.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pool {
    pub address: Address,
    token0: Address,
    token1: Address,
    /// First block to index when no cursor has been stored yet.
    pub start_block: Option<u64>,
}

impl Pool {
    pub fn new(address: Address, asset_a: Address, asset_b: Address) -> Result<Self, PoolError> {
        if asset_a == asset_b {
            return Err(PoolError::IdenticalAssets(address));
        }
        let (token0, token1) = if asset_a < asset_b {
            (asset_a, asset_b)
        } else {
            (asset_b, asset_a)
        };
        Ok(Self {
            address,
            token0,
            token1,
            start_block: None,
        })
    }

    pub fn with_start_block(mut self, start_block: u64) -> Self {
        self.start_block = Some(start_block);
        self
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    pub fn contains(&self, token: Address) -> bool {
        token == self.token0 || token == self.token1
    }

    /// The other asset of the pair, or `None` if `token` is not in it.
    pub fn counterpart(&self, token: Address) -> Option<Address> {
        if token == self.token0 {
            Some(self.token1)
        } else if token == self.token1 {
            Some(self.token0)
        } else {
            None
        }
    }
}
