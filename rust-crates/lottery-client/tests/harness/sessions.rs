use crate::connected;
use lottery_client::{
    ActionError,
    LotteryError,
    state::Session,
    test_helpers::{
        FakeNetwork,
        FakeWallet,
        controller,
        ether,
        player,
        settle,
    },
};

#[tokio::test]
async fn session__no_wallet_installed__every_action_explains_itself() {
    // given
    let network = FakeNetwork::new();
    let client = controller(&network, FakeWallet::absent());

    // when
    let connect = client.connect().await;
    let enter = client.enter().await;

    // then
    assert!(matches!(
        connect,
        Err(ActionError::Failed(LotteryError::WalletUnavailable(_)))
    ));
    assert_eq!(enter, Err(ActionError::Failed(LotteryError::NotConnected)));
    assert_eq!(client.snapshot().session, Session::default());
    assert_eq!(network.listener_count(), 0);
}

#[tokio::test]
async fn session__wallet_offers_several_accounts__first_one_signs() {
    // given
    let network = FakeNetwork::new();
    network.fund(player(2), ether(100));
    let client = controller(&network, FakeWallet::with_accounts(vec![player(2), player(1)]));

    // when
    client.connect().await.unwrap();
    client.enter().await.unwrap();

    // then
    assert_eq!(client.snapshot().session, Session::connected(player(2)));
    assert_eq!(network.players(), vec![player(2)]);
}

#[tokio::test]
async fn session__many_reconnects__keep_a_single_event_listener() {
    // given
    let network = FakeNetwork::new();
    let client = connected(&network, player(1)).await;

    // when
    for _ in 0..5 {
        client.connect().await.unwrap();
    }
    settle().await;

    // then
    assert_eq!(network.listener_count(), 1);

    client.disconnect();
    settle().await;
    assert_eq!(network.listener_count(), 0);
}

#[tokio::test]
async fn session__node_unreachable__connect_fails_and_recovers_later() {
    // given
    let network = FakeNetwork::new();
    network.set_reachable(false);
    let client = controller(&network, FakeWallet::with_accounts(vec![player(1)]));

    // when
    let first = client.connect().await;
    network.set_reachable(true);
    let second = client.connect().await;

    // then
    assert!(matches!(
        first,
        Err(ActionError::Failed(LotteryError::NetworkUnreachable(_)))
    ));
    assert!(second.is_ok());
    assert!(client.snapshot().session.connected);
    assert_eq!(client.snapshot().lottery_id, Some(1));
}
