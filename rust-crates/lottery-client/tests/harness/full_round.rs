use crate::connected;
use lottery_client::{
    ActionError,
    LotteryError,
    state::UiFeedback,
    test_helpers::{
        FakeMethod,
        FakeNetwork,
        ether,
        owner,
        player,
    },
    types::{
        Amount,
        HistoryEntry,
    },
};

#[tokio::test]
async fn round__three_entries_then_draw_and_payout__closes_round_for_every_client() {
    // given
    let network = FakeNetwork::new();
    let alice = connected(&network, player(1)).await;
    let bob = connected(&network, player(2)).await;
    let admin = connected(&network, owner()).await;

    // when
    alice.enter().await.unwrap();
    bob.enter().await.unwrap();
    alice.enter().await.unwrap();
    admin.refresh().await;
    let before_draw = admin.snapshot();
    admin.select_winner().await.unwrap();
    admin.pay_winner().await.unwrap();
    alice.refresh().await;

    // then
    assert_eq!(before_draw.players, vec![player(1), player(2), player(1)]);
    assert_eq!(before_draw.pot, Some(Amount::from_wei(ether(45))));
    // round 1 with three tickets draws index 1
    let expected = HistoryEntry {
        round_id: 1,
        winner: player(2),
    };
    assert_eq!(
        admin.snapshot().feedback,
        UiFeedback::Success(format!("The winner of round 1 is {}", player(2)))
    );
    let after = alice.snapshot();
    assert_eq!(after.lottery_id, Some(2));
    assert_eq!(after.history, vec![expected]);
    assert!(after.players.is_empty());
    assert_eq!(network.submitted(FakeMethod::PayWinner), 1);
}

#[tokio::test]
async fn round__player_tries_to_draw__contract_refuses_and_state_is_untouched() {
    // given
    let network = FakeNetwork::new();
    let alice = connected(&network, player(1)).await;
    alice.enter().await.unwrap();
    let before = alice.snapshot();

    // when
    let result = alice.select_winner().await;

    // then
    assert_eq!(
        result,
        Err(ActionError::Failed(LotteryError::TransactionRejected(
            "unauthorized".to_string()
        )))
    );
    let after = alice.snapshot();
    assert_eq!(after.players, before.players);
    assert_eq!(after.lottery_id, before.lottery_id);
    assert_eq!(after.feedback.error_message(), Some("unauthorized"));
}

#[tokio::test]
async fn round__several_completed__history_lists_most_recent_first() {
    // given
    let network = FakeNetwork::new();
    let admin = connected(&network, owner()).await;
    for account in [player(1), player(2), player(3)] {
        let client = connected(&network, account).await;
        client.enter().await.unwrap();
        admin.select_winner().await.unwrap();
        admin.pay_winner().await.unwrap();
    }

    // when
    admin.refresh().await;

    // then
    let snapshot = admin.snapshot();
    assert_eq!(snapshot.lottery_id, Some(4));
    let rounds: Vec<(u64, _)> = snapshot
        .history
        .iter()
        .map(|entry| (entry.round_id, entry.winner))
        .collect();
    assert_eq!(
        rounds,
        vec![(3, player(3)), (2, player(2)), (1, player(1))]
    );
}
