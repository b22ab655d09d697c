use crate::actions::ActionKind;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LotteryError {
    #[error("{0}")]
    WalletUnavailable(String),
    #[error("{0}")]
    UserRejected(String),
    #[error("{0}")]
    InsufficientFunds(String),
    #[error("{0}")]
    GasEstimationFailed(String),
    #[error("{0}")]
    TransactionRejected(String),
    #[error("no winner recorded for round {0}")]
    InvalidRound(u64),
    #[error("{0}")]
    NetworkUnreachable(String),
    #[error("wallet not connected")]
    NotConnected,
    #[error("{0}")]
    UnexpectedResponse(String),
}

pub type Result<T, E = LotteryError> = std::result::Result<T, E>;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{0} is already in progress")]
    InFlight(ActionKind),
    #[error(transparent)]
    Failed(#[from] LotteryError),
}
