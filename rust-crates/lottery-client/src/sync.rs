use crate::{
    contract::LotteryContract,
    controller::LotteryController,
    gateway::ContractBinder,
    history,
    state::Generation,
};
use tracing::{
    debug,
    warn,
};

impl<W, B: ContractBinder> LotteryController<W, B> {
    /// Re-reads round id, history, pot and players from the contract.
    pub async fn refresh(&self) {
        let Some(binding) = self.current_binding() else {
            debug!("refresh skipped; no contract binding");
            return;
        };
        let generation = self.store.begin_refresh();
        let contract = &binding.contract;
        debug!(?generation, "refresh started");

        match contract.read_lottery_id().await {
            Ok(lottery_id) => {
                if !self
                    .store
                    .commit(generation, |s| s.lottery_id = Some(lottery_id))
                {
                    return;
                }
                if !self.rebuild_history(contract, generation, lottery_id).await {
                    return;
                }
            }
            Err(err) => {
                warn!(%err, "reading lottery id failed; keeping previous round and history");
            }
        }

        let (pot, players) = tokio::join!(contract.read_pot(), contract.read_players());
        match pot {
            Ok(pot) => {
                self.store.commit(generation, |s| s.pot = Some(pot));
            }
            Err(err) => warn!(%err, "reading pot failed"),
        }
        match players {
            Ok(players) => {
                self.store.commit(generation, |s| s.players = players);
            }
            Err(err) => warn!(%err, "reading players failed"),
        }
        debug!(?generation, "refresh finished");
    }

    /// Returns `false` once the pass has gone stale.
    async fn rebuild_history(
        &self,
        contract: &B::Contract,
        generation: Generation,
        lottery_id: u64,
    ) -> bool {
        if !self.store.commit(generation, |s| s.history.clear()) {
            return false;
        }
        let mut current = true;
        let result = history::reconstruct(contract, lottery_id, |entry| {
            current = self
                .store
                .commit(generation, |s| s.history.push(entry));
            current
        })
        .await;
        match result {
            Ok(rounds) => debug!(rounds, "history rebuilt"),
            Err(err) => warn!(%err, "history reconstruction aborted"),
        }
        current
    }
}
