pub mod actions;
pub mod client;
pub mod contract;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod history;
pub mod state;
mod sync;
pub mod types;
pub mod ui;
pub mod wallets;

pub use controller::LotteryController;
pub use error::{
    ActionError,
    LotteryError,
};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
