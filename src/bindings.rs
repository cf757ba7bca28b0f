//! Solidity ABI bindings for the bond depository, its reserve tokens,
//! the bonding calculator, Chainlink price feeds, and the market pair.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IBondDepository {
        function bondPrice() external view returns (uint256);
        function bondPriceInUSD() external view returns (uint256);
        function payoutFor(uint256 value) external view returns (uint256);
        function maxPayout() external view returns (uint256);
        function standardizedDebtRatio() external view returns (uint256);
        function pendingPayoutFor(address depositor) external view returns (uint256);
        function terms()
            external
            view
            returns (
                uint256 controlVariable,
                uint256 vestingTerm,
                uint256 minimumPrice,
                uint256 maxPayout,
                uint256 fee,
                uint256 maxDebt
            );
        function bondInfo(address depositor)
            external
            view
            returns (uint256 payout, uint256 vesting, uint256 lastTimestamp, uint256 pricePaid);

        function deposit(uint256 amount, uint256 maxPrice, address depositor) external returns (uint256);
        function redeem(address recipient, bool stake) external returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IBondingCalculator {
        function valuation(address pair, uint256 amount) external view returns (uint256);
        function markdown(address pair) external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface AggregatorV3Interface {
        function latestRoundData()
            external
            view
            returns (
                uint80 roundId,
                int256 answer,
                uint256 startedAt,
                uint256 updatedAt,
                uint80 answeredInRound
            );
    }
}

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function getReserves()
            external
            view
            returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}
