//! Contract interfaces of the DEX.

use alloy_sol_types::sol;

sol! {
    /// A trading pair. Reserves are returned in the pair's canonical
    /// (lower address first) token order.
    interface IMetaPair {
        event Swapped(
            address indexed user,
            address inputToken,
            address outputToken,
            uint256 inputAmount,
            uint256 outputAmount
        );

        function getReserves() external view returns (uint256 reserveA, uint256 reserveB);
        function tokenA() external view returns (address);
        function tokenB() external view returns (address);
    }

    /// Creates pairs and enumerates them in creation order.
    interface IMetaFactory {
        function allPairsLength() external view returns (uint256);
        function allPairs(uint256 index) external view returns (address);
    }
}
