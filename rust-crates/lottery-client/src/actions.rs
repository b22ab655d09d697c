use crate::{
    contract::LotteryContract,
    controller::LotteryController,
    error::{
        ActionError,
        LotteryError,
    },
    gateway::{
        ContractBinder,
        ContractBinding,
        WalletCapability,
    },
    types::ENTRY_STAKE,
};
use std::{
    collections::HashSet,
    fmt,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
};
use tracing::{
    info,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Connect,
    Enter,
    SelectWinner,
    PayWinner,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Connect => "connect",
            ActionKind::Enter => "enter",
            ActionKind::SelectWinner => "select winner",
            ActionKind::PayWinner => "pay winner",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    active: Mutex<HashSet<ActionKind>>,
}

impl InFlight {
    pub(crate) fn try_begin(&self, kind: ActionKind) -> Result<InFlightGuard<'_>, ActionError> {
        if !self.lock().insert(kind) {
            info!(action = %kind, "action refused; already in progress");
            return Err(ActionError::InFlight(kind));
        }
        Ok(InFlightGuard {
            in_flight: self,
            kind,
        })
    }

    pub(crate) fn is_active(&self, kind: ActionKind) -> bool {
        self.lock().contains(&kind)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ActionKind>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct InFlightGuard<'a> {
    in_flight: &'a InFlight,
    kind: ActionKind,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.kind);
    }
}

impl<W, B> LotteryController<W, B>
where
    W: WalletCapability,
    B: ContractBinder<Account = W::Account>,
{
    pub async fn connect(&self) -> Result<(), ActionError> {
        let guard = self.in_flight.try_begin(ActionKind::Connect)?;
        self.store.clear_feedback();

        let connection = match self.gateway.connect().await {
            Ok(connection) => connection,
            Err(err) => return Err(self.fail(ActionKind::Connect, err)),
        };
        let address = connection.binding.signer;
        self.install(connection).await;
        self.store.set_success(format!("Connected as {address}"));
        drop(guard);

        self.refresh().await;
        Ok(())
    }

    pub async fn enter(&self) -> Result<(), ActionError> {
        let guard = self.in_flight.try_begin(ActionKind::Enter)?;
        self.store.clear_feedback();
        let binding = self.require_binding(ActionKind::Enter)?;
        let round = self.store.snapshot().lottery_id;

        let receipt = match binding.contract.enter(ENTRY_STAKE).await {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.fail(ActionKind::Enter, err)),
        };
        info!(tx_hash = %receipt.tx_hash, stake = %ENTRY_STAKE, ?round, "entered the lottery");
        let message = match round {
            Some(round) => format!("You have entered lottery round {round}"),
            None => "You have entered the lottery".to_string(),
        };
        self.store.set_success(message);
        drop(guard);

        self.refresh().await;
        Ok(())
    }

    pub async fn select_winner(&self) -> Result<(), ActionError> {
        let guard = self.in_flight.try_begin(ActionKind::SelectWinner)?;
        self.store.clear_feedback();
        let binding = self.require_binding(ActionKind::SelectWinner)?;
        let round = self.store.snapshot().lottery_id;

        let receipt = match binding.contract.select_winner().await {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.fail(ActionKind::SelectWinner, err)),
        };
        info!(tx_hash = %receipt.tx_hash, ?round, "winner selected");
        let message = match round {
            Some(round) => format!("A winner has been selected for round {round}"),
            None => "A winner has been selected".to_string(),
        };
        self.store.set_success(message);
        drop(guard);

        self.refresh().await;
        Ok(())
    }

    pub async fn pay_winner(&self) -> Result<(), ActionError> {
        let guard = self.in_flight.try_begin(ActionKind::PayWinner)?;
        self.store.clear_feedback();
        let binding = self.require_binding(ActionKind::PayWinner)?;

        // payout advances the round, so pin the one being closed first
        let round = match binding.contract.read_lottery_id().await {
            Ok(round) => round,
            Err(err) => match self.store.snapshot().lottery_id {
                Some(round) => {
                    warn!(%err, round, "round read failed; using the last synchronized round");
                    round
                }
                None => return Err(self.fail(ActionKind::PayWinner, err)),
            },
        };

        let receipt = match binding.contract.pay_winner().await {
            Ok(receipt) => receipt,
            Err(err) => return Err(self.fail(ActionKind::PayWinner, err)),
        };
        info!(tx_hash = %receipt.tx_hash, round, "winner paid");
        let message = match binding.contract.read_history_entry(round).await {
            Ok(winner) => format!("The winner of round {round} is {winner}"),
            Err(err) => {
                warn!(%err, round, "winner lookup after payout failed");
                format!("The winner of round {round} has been paid")
            }
        };
        self.store.set_success(message);
        drop(guard);

        self.refresh().await;
        Ok(())
    }

    fn require_binding(
        &self,
        kind: ActionKind,
    ) -> Result<Arc<ContractBinding<B::Contract>>, ActionError> {
        self.current_binding()
            .ok_or_else(|| self.fail(kind, LotteryError::NotConnected))
    }

    fn fail(&self, kind: ActionKind, err: LotteryError) -> ActionError {
        warn!(action = %kind, %err, "action failed");
        self.store.set_error(err.to_string());
        ActionError::Failed(err)
    }
}

#[cfg(test)]
mod tests;
