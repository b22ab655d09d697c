#![allow(non_snake_case)]

use super::*;
use crate::{
    state::{
        Session,
        UiFeedback,
    },
    test_helpers::{
        FakeMethod,
        FakeNetwork,
        FakeWallet,
        controller,
        ether,
        owner,
        player,
        settle,
        until,
    },
    types::HistoryEntry,
};

#[tokio::test]
async fn connect__no_wallet__reports_wallet_unavailable() {
    // given
    let network = FakeNetwork::new();
    let controller = controller(&network, FakeWallet::absent());

    // when
    let result = controller.connect().await;

    // then
    assert!(matches!(
        result,
        Err(ActionError::Failed(LotteryError::WalletUnavailable(_)))
    ));
    let snapshot = controller.snapshot();
    assert!(snapshot.feedback.error_message().is_some());
    assert_eq!(snapshot.session, Session::default());
    assert_eq!(network.binds(), 0);
}

#[tokio::test]
async fn connect__user_declines__reports_rejection_and_stays_disconnected() {
    // given
    let network = FakeNetwork::new();
    let controller = controller(&network, FakeWallet::rejecting());

    // when
    let result = controller.connect().await;

    // then
    assert!(matches!(
        result,
        Err(ActionError::Failed(LotteryError::UserRejected(_)))
    ));
    assert_eq!(
        controller.snapshot().feedback,
        UiFeedback::Error("user rejected the request".to_string())
    );
    assert!(!controller.snapshot().session.connected);
}

#[tokio::test]
async fn connect__authorized__reports_address_and_subscribes() {
    // given
    let network = FakeNetwork::new();
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));

    // when
    controller.connect().await.unwrap();

    // then
    let snapshot = controller.snapshot();
    assert_eq!(
        snapshot.feedback.success_message(),
        Some(format!("Connected as {}", player(1)).as_str())
    );
    assert_eq!(snapshot.lottery_id, Some(1));
    assert!(controller.has_event_subscription());
    assert_eq!(network.listener_count(), 1);
}

#[tokio::test]
async fn connect__twice__replaces_binding_without_leaking_listeners() {
    // given
    let network = FakeNetwork::new();
    let wallet = FakeWallet::with_accounts(vec![player(1)]);
    let controller = controller(&network, wallet);
    controller.connect().await.unwrap();

    // when
    controller.connect().await.unwrap();
    settle().await;

    // then
    assert_eq!(network.binds(), 2);
    assert_eq!(network.listener_count(), 1);
    assert_eq!(controller.snapshot().session, Session::connected(player(1)));
}

#[tokio::test]
async fn disconnect__connected__drops_listeners_and_resets_state() {
    // given
    let network = FakeNetwork::new();
    network.add_player(player(2), ether(15));
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));
    controller.connect().await.unwrap();

    // when
    controller.disconnect();
    settle().await;

    // then
    assert_eq!(network.listener_count(), 0);
    assert!(!controller.has_event_subscription());
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.session, Session::default());
    assert!(snapshot.players.is_empty());
    assert_eq!(snapshot.pot, None);
}

#[tokio::test]
async fn enter__funded__reports_round_and_shows_new_ticket() {
    // given
    let network = FakeNetwork::new();
    network.fund(player(1), ether(100));
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));
    controller.connect().await.unwrap();

    // when
    controller.enter().await.unwrap();

    // then
    let snapshot = controller.snapshot();
    assert_eq!(
        snapshot.feedback,
        UiFeedback::Success("You have entered lottery round 1".to_string())
    );
    assert_eq!(snapshot.players, vec![player(1)]);
    assert_eq!(snapshot.pot, Some(ENTRY_STAKE));
    assert_eq!(network.balance(player(1)), ether(85));
}

#[tokio::test]
async fn enter__insufficient_funds__reports_error_and_leaves_players_unchanged() {
    // given
    let network = FakeNetwork::new();
    network.add_player(player(2), ether(15));
    network.fund(player(1), ether(10));
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));
    controller.connect().await.unwrap();

    // when
    let result = controller.enter().await;

    // then
    assert!(matches!(
        result,
        Err(ActionError::Failed(LotteryError::InsufficientFunds(_)))
    ));
    let snapshot = controller.snapshot();
    assert!(snapshot.feedback.error_message().is_some());
    assert_eq!(snapshot.players, vec![player(2)]);
    assert_eq!(network.submitted(FakeMethod::Enter), 0);
}

#[tokio::test]
async fn enter__not_connected__reports_not_connected() {
    // given
    let network = FakeNetwork::new();
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));

    // when
    let result = controller.enter().await;

    // then
    assert_eq!(result, Err(ActionError::Failed(LotteryError::NotConnected)));
    assert_eq!(
        controller.snapshot().feedback,
        UiFeedback::Error("wallet not connected".to_string())
    );
}

#[tokio::test]
async fn enter__confirmed__ticket_appears_only_once_refresh_commits() {
    // given
    let network = FakeNetwork::new();
    network.fund(player(1), ether(100));
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));
    controller.connect().await.unwrap();
    let gate = network.hold(FakeMethod::Players);

    // when
    let (result, players_while_refreshing) = tokio::join!(controller.enter(), async {
        until(|| network.submitted(FakeMethod::Enter) == 1).await;
        let players = controller.snapshot().players;
        gate.release();
        players
    });

    // then
    result.unwrap();
    assert!(players_while_refreshing.is_empty());
    assert_eq!(controller.snapshot().players, vec![player(1)]);
}

#[tokio::test]
async fn enter__round_closes_before_confirmation__reports_round_at_submission() {
    // given
    let network = FakeNetwork::new();
    network.fund(player(1), ether(100));
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));
    controller.connect().await.unwrap();
    let gate = network.hold(FakeMethod::Enter);

    // when
    let (result, round_while_pending) = tokio::join!(controller.enter(), async {
        until(|| controller.is_in_flight(ActionKind::Enter)).await;
        network.complete_round(player(9));
        controller.refresh().await;
        let round = controller.snapshot().lottery_id;
        gate.release();
        round
    });

    // then
    result.unwrap();
    assert_eq!(round_while_pending, Some(2));
    assert_eq!(
        controller.snapshot().feedback,
        UiFeedback::Success("You have entered lottery round 1".to_string())
    );
}

#[tokio::test]
async fn select_winner__not_owner__reports_revert_reason_without_refresh() {
    // given
    let network = FakeNetwork::new();
    network.add_player(player(2), ether(15));
    let controller = controller(&network, FakeWallet::with_accounts(vec![player(1)]));
    controller.connect().await.unwrap();
    network.add_player(player(3), ether(15));

    // when
    let result = controller.select_winner().await;

    // then
    assert_eq!(
        result,
        Err(ActionError::Failed(LotteryError::TransactionRejected(
            "unauthorized".to_string()
        )))
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.feedback, UiFeedback::Error("unauthorized".to_string()));
    assert_eq!(snapshot.players, vec![player(2)]);
}

#[tokio::test]
async fn select_winner__while_pending__refuses_second_attempt() {
    // given
    let network = FakeNetwork::new();
    network.add_player(player(2), ether(15));
    let controller = controller(&network, FakeWallet::with_accounts(vec![owner()]));
    controller.connect().await.unwrap();
    let gate = network.hold(FakeMethod::SelectWinner);

    // when
    let (first, second) = tokio::join!(controller.select_winner(), async {
        until(|| controller.is_in_flight(ActionKind::SelectWinner)).await;
        let second = controller.select_winner().await;
        let feedback = controller.snapshot().feedback;
        gate.release();
        (second, feedback)
    });

    // then
    first.unwrap();
    let (second, feedback_after_refusal) = second;
    assert_eq!(second, Err(ActionError::InFlight(ActionKind::SelectWinner)));
    assert_eq!(feedback_after_refusal, UiFeedback::None);
    assert_eq!(network.submitted(FakeMethod::SelectWinner), 1);
    assert!(!controller.is_in_flight(ActionKind::SelectWinner));
}

#[tokio::test]
async fn select_winner__owner__reports_round() {
    // given
    let network = FakeNetwork::new();
    network.complete_round(player(9));
    network.add_player(player(2), ether(15));
    let controller = controller(&network, FakeWallet::with_accounts(vec![owner()]));
    controller.connect().await.unwrap();

    // when
    controller.select_winner().await.unwrap();

    // then
    assert_eq!(
        controller.snapshot().feedback.success_message(),
        Some("A winner has been selected for round 2")
    );
}

#[tokio::test]
async fn pay_winner__after_selection__reports_winner_of_closed_round() {
    // given
    let network = FakeNetwork::new();
    network.add_player(player(1), ether(15));
    network.add_player(player(2), ether(15));
    let controller = controller(&network, FakeWallet::with_accounts(vec![owner()]));
    controller.connect().await.unwrap();
    controller.select_winner().await.unwrap();

    // when
    controller.pay_winner().await.unwrap();

    // then
    let snapshot = controller.snapshot();
    assert_eq!(
        snapshot.feedback,
        UiFeedback::Success(format!("The winner of round 1 is {}", player(2)))
    );
    assert_eq!(snapshot.lottery_id, Some(2));
    assert_eq!(
        snapshot.history,
        vec![HistoryEntry {
            round_id: 1,
            winner: player(2)
        }]
    );
    assert!(snapshot.players.is_empty());
    assert_eq!(network.balance(player(2)), ether(30));
}

#[tokio::test]
async fn pay_winner__round_read_fails__falls_back_to_synchronized_round() {
    // given
    let network = FakeNetwork::new();
    network.complete_round(player(7));
    network.add_player(player(1), ether(15));
    let controller = controller(&network, FakeWallet::with_accounts(vec![owner()]));
    controller.connect().await.unwrap();
    controller.select_winner().await.unwrap();
    network.fail(
        FakeMethod::LotteryId,
        LotteryError::NetworkUnreachable("timeout".into()),
    );

    // when
    controller.pay_winner().await.unwrap();

    // then
    assert_eq!(
        controller.snapshot().feedback.success_message(),
        Some(format!("The winner of round 2 is {}", player(1)).as_str())
    );
}

#[tokio::test]
async fn pay_winner__no_winner_selected__reports_revert_reason() {
    // given
    let network = FakeNetwork::new();
    let controller = controller(&network, FakeWallet::with_accounts(vec![owner()]));
    controller.connect().await.unwrap();

    // when
    let result = controller.pay_winner().await;

    // then
    assert_eq!(
        result,
        Err(ActionError::Failed(LotteryError::TransactionRejected(
            "winner not selected".to_string()
        )))
    );
    assert_eq!(controller.snapshot().lottery_id, Some(1));
}

#[test]
fn action_kind__display__reads_naturally_in_refusals() {
    let err = ActionError::InFlight(ActionKind::PayWinner);
    assert_eq!(err.to_string(), "pay winner is already in progress");
}
