use crate::{
    error::Result,
    types::{
        Amount,
        TxReceipt,
    },
};
use alloy::primitives::Address;
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::info;

pub mod evm;

/// Typed facade over the lottery contract.
pub trait LotteryContract: Send + Sync + 'static {
    fn read_pot(&self) -> impl Future<Output = Result<Amount>> + Send;

    fn read_players(&self) -> impl Future<Output = Result<Vec<Address>>> + Send;

    fn read_lottery_id(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Recorded winner of a completed round; `InvalidRound` otherwise.
    fn read_history_entry(
        &self,
        round_id: u64,
    ) -> impl Future<Output = Result<Address>> + Send;

    fn enter(&self, stake: Amount) -> impl Future<Output = Result<TxReceipt>> + Send;

    fn select_winner(&self) -> impl Future<Output = Result<TxReceipt>> + Send;

    fn pay_winner(&self) -> impl Future<Output = Result<TxReceipt>> + Send;

    /// Starts logging `LotteryEntered` and `LotteryWinner` events until the
    /// returned handle is dropped.
    fn subscribe_events(&self) -> impl Future<Output = Result<EventSubscription>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LotteryEvent {
    Entered { player: Address, amount: Amount },
    Winner { winner: Address, amount: Amount },
}

pub fn log_event(event: &LotteryEvent) {
    match event {
        LotteryEvent::Entered { player, amount } => {
            info!(%player, %amount, "{player} entered the lottery with {amount} ETH");
        }
        LotteryEvent::Winner { winner, amount } => {
            info!(%winner, %amount, "{winner} won the lottery with {amount} ETH");
        }
    }
}

/// Listener tasks for contract events. Dropping the handle unsubscribes.
#[derive(Debug, Default)]
pub struct EventSubscription {
    listeners: Vec<JoinHandle<()>>,
}

impl EventSubscription {
    pub fn new(listeners: Vec<JoinHandle<()>>) -> Self {
        Self { listeners }
    }

    pub fn is_active(&self) -> bool {
        self.listeners.iter().any(|task| !task.is_finished())
    }

    pub fn unsubscribe(mut self) {
        self.abort_all();
    }

    fn abort_all(&mut self) {
        for task in self.listeners.drain(..) {
            task.abort();
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.abort_all();
    }
}
