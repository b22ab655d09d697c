use crate::{
    contract::LotteryContract,
    error::{
        LotteryError,
        Result,
    },
    state::Session,
};
use alloy::{
    primitives::Address,
    signers::local::PrivateKeySigner,
};
use std::future::Future;
use tracing::info;

pub trait WalletCapability: Send + Sync + 'static {
    type Account: AccountAddress + Send;

    fn is_available(&self) -> bool;

    fn request_accounts(&self)
    -> impl Future<Output = Result<Vec<Self::Account>>> + Send;
}

pub trait AccountAddress {
    fn address(&self) -> Address;
}

impl AccountAddress for PrivateKeySigner {
    fn address(&self) -> Address {
        PrivateKeySigner::address(self)
    }
}

impl AccountAddress for Address {
    fn address(&self) -> Address {
        *self
    }
}

pub trait ContractBinder: Send + Sync + 'static {
    type Account;
    type Contract: LotteryContract;

    fn contract_address(&self) -> Address;

    fn bind(
        &self,
        account: Self::Account,
    ) -> impl Future<Output = Result<Self::Contract>> + Send;
}

pub struct ContractBinding<C> {
    pub contract_address: Address,
    pub signer: Address,
    pub contract: C,
}

pub struct Connection<C> {
    pub session: Session,
    pub binding: ContractBinding<C>,
}

pub struct ChainGateway<W, B> {
    wallet: W,
    binder: B,
}

impl<W, B> ChainGateway<W, B>
where
    W: WalletCapability,
    B: ContractBinder<Account = W::Account>,
{
    pub fn new(wallet: W, binder: B) -> Self {
        Self { wallet, binder }
    }

    pub fn contract_address(&self) -> Address {
        self.binder.contract_address()
    }

    pub async fn connect(&self) -> Result<Connection<B::Contract>> {
        if !self.wallet.is_available() {
            return Err(LotteryError::WalletUnavailable(
                "no wallet available; create or import a keystore first".to_string(),
            ));
        }

        let account = self
            .wallet
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LotteryError::UserRejected("no account was authorized".to_string())
            })?;
        let signer = account.address();
        let contract = self.binder.bind(account).await?;
        info!(%signer, contract = %self.binder.contract_address(), "wallet connected");

        Ok(Connection {
            session: Session::connected(signer),
            binding: ContractBinding {
                contract_address: self.binder.contract_address(),
                signer,
                contract,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::{
        FakeNetwork,
        FakeWallet,
        player,
    };

    #[tokio::test]
    async fn connect__no_wallet__fails_with_wallet_unavailable() {
        // given
        let network = FakeNetwork::new();
        let gateway = ChainGateway::new(FakeWallet::absent(), network.binder());

        // when
        let result = gateway.connect().await;

        // then
        assert!(matches!(result, Err(LotteryError::WalletUnavailable(_))));
    }

    #[tokio::test]
    async fn connect__user_declines__fails_with_user_rejected() {
        // given
        let network = FakeNetwork::new();
        let gateway = ChainGateway::new(FakeWallet::rejecting(), network.binder());

        // when
        let result = gateway.connect().await;

        // then
        assert!(matches!(result, Err(LotteryError::UserRejected(_))));
    }

    #[tokio::test]
    async fn connect__wallet_without_accounts__fails_with_user_rejected() {
        // given
        let network = FakeNetwork::new();
        let gateway = ChainGateway::new(FakeWallet::with_accounts(vec![]), network.binder());

        // when
        let result = gateway.connect().await;

        // then
        assert!(matches!(result, Err(LotteryError::UserRejected(_))));
    }

    #[tokio::test]
    async fn connect__authorized__binds_first_account() {
        // given
        let network = FakeNetwork::new();
        let first = player(1);
        let gateway = ChainGateway::new(
            FakeWallet::with_accounts(vec![first, player(2)]),
            network.binder(),
        );

        // when
        let connection = gateway.connect().await.unwrap();

        // then
        assert_eq!(connection.session, Session::connected(first));
        assert_eq!(connection.binding.signer, first);
        assert_eq!(connection.binding.contract_address, network.contract_address());
        assert_eq!(connection.binding.contract.caller(), first);
    }

    #[tokio::test]
    async fn connect__node_down__fails_with_network_unreachable() {
        // given
        let network = FakeNetwork::new();
        network.set_reachable(false);
        let gateway = ChainGateway::new(FakeWallet::with_accounts(vec![player(1)]), network.binder());

        // when
        let result = gateway.connect().await;

        // then
        assert!(matches!(result, Err(LotteryError::NetworkUnreachable(_))));
    }
}
