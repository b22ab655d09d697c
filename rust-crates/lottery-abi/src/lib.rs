//! Typed bindings for the on-chain lottery contract.

pub use alloy::primitives::{
    Address,
    U256,
};

pub mod lottery_types {
    use alloy::sol;

    sol! {
        #[sol(rpc)]
        contract Lottery {
            event LotteryEntered(address indexed player, uint256 amount);
            event LotteryWinner(address indexed winner, uint256 amount);

            function getPlayers() external view returns (address[] memory);
            function lotteryId() external view returns (uint256);
            function lotteryHistory(uint256 roundId) external view returns (address);

            function enter() external payable;
            function pickWinner() external;
            function payWinner() external;
        }
    }
}

pub use lottery_types::Lottery;
