use crate::{
    contract::LotteryContract,
    error::Result,
    types::HistoryEntry,
};

/// Rebuilds the winners of every completed round before `lottery_id`, most
/// recent first. `emit` returning `false` stops the pass early.
pub async fn reconstruct<C, F>(contract: &C, lottery_id: u64, mut emit: F) -> Result<usize>
where
    C: LotteryContract,
    F: FnMut(HistoryEntry) -> bool,
{
    let mut emitted = 0;
    for round_id in (1..lottery_id).rev() {
        let winner = contract.read_history_entry(round_id).await?;
        emitted += 1;
        if !emit(HistoryEntry { round_id, winner }) {
            break;
        }
    }
    Ok(emitted)
}
