use crate::{
    contract::{
        EventSubscription,
        LotteryContract,
        LotteryEvent,
        log_event,
    },
    error::{
        LotteryError,
        Result,
    },
    gateway::ContractBinder,
    types::{
        Amount,
        GAS_LIMIT,
        TxReceipt,
    },
};
use alloy::{
    contract::Error as ContractError,
    hex,
    network::{
        EthereumWallet,
        TransactionBuilder,
    },
    primitives::{
        Address,
        TxHash,
        U256,
        keccak256,
    },
    providers::{
        DynProvider,
        PendingTransactionError,
        Provider,
        ProviderBuilder,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::{
        Revert,
        SolError,
    },
    transports::{
        RpcError,
        TransportError,
    },
};
use futures::StreamExt;
use lottery_abi::Lottery;
use std::time::Duration;
use tracing::{
    debug,
    info,
    warn,
};
use url::Url;

const REQUIRED_CONFIRMATIONS: u64 = 1;
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Read,
    Estimate,
    Submit,
}

pub struct LotteryProxy {
    contract: Lottery::LotteryInstance<DynProvider>,
    provider: DynProvider,
    signer: Address,
}

impl LotteryProxy {
    pub fn new(contract_address: Address, signer: Address, provider: DynProvider) -> Self {
        let contract = Lottery::new(contract_address, provider.clone());
        Self {
            contract,
            provider,
            signer,
        }
    }

    async fn submit(&self, label: &'static str, tx: TransactionRequest) -> Result<TxReceipt> {
        let tx = tx.with_from(self.signer);
        let estimate = self
            .provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|err| classify_rpc(&err, Phase::Estimate))?;
        if estimate > GAS_LIMIT {
            return Err(LotteryError::GasEstimationFailed(format!(
                "{label} needs an estimated {estimate} gas, above the {GAS_LIMIT} gas limit"
            )));
        }
        debug!(label, estimate, "gas estimated");

        let pending = self
            .provider
            .send_transaction(tx.with_gas_limit(GAS_LIMIT))
            .await
            .map_err(|err| classify_rpc(&err, Phase::Submit))?;
        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, label, "transaction submitted; waiting for confirmation");

        let receipt = pending
            .with_required_confirmations(REQUIRED_CONFIRMATIONS)
            .with_timeout(Some(CONFIRMATION_TIMEOUT))
            .get_receipt()
            .await
            .map_err(classify_pending)?;
        ensure_succeeded(tx_hash, receipt.status())?;

        let confirmed = TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
        };
        info!(
            %tx_hash,
            label,
            block = ?confirmed.block_number,
            gas_used = confirmed.gas_used,
            "transaction confirmed"
        );
        Ok(confirmed)
    }
}

impl LotteryContract for LotteryProxy {
    async fn read_pot(&self) -> Result<Amount> {
        let balance = self
            .provider
            .get_balance(*self.contract.address())
            .await
            .map_err(|err| classify_rpc(&err, Phase::Read))?;
        Ok(Amount::from_wei(balance))
    }

    async fn read_players(&self) -> Result<Vec<Address>> {
        self.contract
            .getPlayers()
            .call()
            .await
            .map_err(classify_contract)
    }

    async fn read_lottery_id(&self) -> Result<u64> {
        let id: U256 = self
            .contract
            .lotteryId()
            .call()
            .await
            .map_err(classify_contract)?;
        u64::try_from(id).map_err(|_| {
            LotteryError::UnexpectedResponse(format!("lottery id {id} exceeds u64 range"))
        })
    }

    async fn read_history_entry(&self, round_id: u64) -> Result<Address> {
        if round_id == 0 {
            return Err(LotteryError::InvalidRound(round_id));
        }
        let winner = self
            .contract
            .lotteryHistory(U256::from(round_id))
            .call()
            .await
            .map_err(classify_contract)?;
        // unrecorded rounds read back as the zero address
        if winner.is_zero() {
            return Err(LotteryError::InvalidRound(round_id));
        }
        Ok(winner)
    }

    async fn enter(&self, stake: Amount) -> Result<TxReceipt> {
        let balance = self
            .provider
            .get_balance(self.signer)
            .await
            .map_err(|err| classify_rpc(&err, Phase::Read))?;
        if balance < stake.wei() {
            return Err(LotteryError::InsufficientFunds(format!(
                "insufficient funds: wallet balance {} ETH is below the {stake} ETH stake",
                Amount::from_wei(balance)
            )));
        }
        let tx = self
            .contract
            .enter()
            .value(stake.wei())
            .into_transaction_request();
        self.submit("enter", tx).await
    }

    async fn select_winner(&self) -> Result<TxReceipt> {
        let tx = self.contract.pickWinner().into_transaction_request();
        self.submit("pickWinner", tx).await
    }

    async fn pay_winner(&self) -> Result<TxReceipt> {
        let tx = self.contract.payWinner().into_transaction_request();
        self.submit("payWinner", tx).await
    }

    async fn subscribe_events(&self) -> Result<EventSubscription> {
        let entered = self
            .contract
            .LotteryEntered_filter()
            .watch()
            .await
            .map_err(|err| classify_rpc(&err, Phase::Read))?;
        let winners = self
            .contract
            .LotteryWinner_filter()
            .watch()
            .await
            .map_err(|err| classify_rpc(&err, Phase::Read))?;

        let entered_listener = tokio::spawn(async move {
            let mut stream = Box::pin(entered.into_stream());
            while let Some(item) = stream.next().await {
                match item {
                    Ok((event, _)) => log_event(&LotteryEvent::Entered {
                        player: event.player,
                        amount: Amount::from_wei(event.amount),
                    }),
                    Err(err) => warn!(?err, "failed to decode LotteryEntered event"),
                }
            }
        });
        let winner_listener = tokio::spawn(async move {
            let mut stream = Box::pin(winners.into_stream());
            while let Some(item) = stream.next().await {
                match item {
                    Ok((event, _)) => log_event(&LotteryEvent::Winner {
                        winner: event.winner,
                        amount: Amount::from_wei(event.amount),
                    }),
                    Err(err) => warn!(?err, "failed to decode LotteryWinner event"),
                }
            }
        });

        Ok(EventSubscription::new(vec![entered_listener, winner_listener]))
    }
}

#[derive(Clone, Debug)]
pub struct EvmBinder {
    rpc_url: Url,
    contract_address: Address,
    chain_id: Option<u64>,
    code_hash: Option<String>,
}

impl EvmBinder {
    pub fn new(rpc_url: Url, contract_address: Address) -> Self {
        Self {
            rpc_url,
            contract_address,
            chain_id: None,
            code_hash: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: Option<u64>) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_code_hash(mut self, code_hash: Option<String>) -> Self {
        self.code_hash = code_hash;
        self
    }

    /// Checks that the node serves the recorded chain and that the contract
    /// code is deployed and matches the recorded hash.
    async fn verify(&self, provider: &DynProvider) -> Result<()> {
        if let Some(expected) = self.chain_id {
            let actual = provider
                .get_chain_id()
                .await
                .map_err(|err| classify_rpc(&err, Phase::Read))?;
            if actual != expected {
                return Err(LotteryError::UnexpectedResponse(format!(
                    "{} serves chain {actual}, but the deployment record is for chain {expected}",
                    self.rpc_url
                )));
            }
        }

        let code = provider
            .get_code_at(self.contract_address)
            .await
            .map_err(|err| classify_rpc(&err, Phase::Read))?;
        if code.is_empty() {
            return Err(LotteryError::UnexpectedResponse(format!(
                "no contract deployed at {} on {}",
                self.contract_address, self.rpc_url
            )));
        }
        if let Some(expected) = &self.code_hash {
            let actual = hex::encode(keccak256(&code));
            if !expected
                .trim_start_matches("0x")
                .eq_ignore_ascii_case(&actual)
            {
                return Err(LotteryError::UnexpectedResponse(format!(
                    "contract code at {} does not match the deployment record \
                     (expected {expected}, found 0x{actual})",
                    self.contract_address
                )));
            }
        }
        Ok(())
    }
}

impl ContractBinder for EvmBinder {
    type Account = PrivateKeySigner;
    type Contract = LotteryProxy;

    fn contract_address(&self) -> Address {
        self.contract_address
    }

    async fn bind(&self, account: PrivateKeySigner) -> Result<LotteryProxy> {
        let signer = account.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(account))
            .connect_http(self.rpc_url.clone())
            .erased();

        self.verify(&provider).await?;

        info!(%signer, contract = %self.contract_address, "contract bound");
        Ok(LotteryProxy::new(self.contract_address, signer, provider))
    }
}

fn ensure_succeeded(tx_hash: TxHash, status: bool) -> Result<()> {
    if status {
        Ok(())
    } else {
        Err(LotteryError::TransactionRejected(format!(
            "transaction {tx_hash} reverted"
        )))
    }
}

fn classify_contract(err: ContractError) -> LotteryError {
    match err {
        ContractError::TransportError(err) => classify_rpc(&err, Phase::Read),
        other => LotteryError::UnexpectedResponse(other.to_string()),
    }
}

fn classify_pending(err: PendingTransactionError) -> LotteryError {
    match err {
        PendingTransactionError::TransportError(err) => classify_rpc(&err, Phase::Submit),
        other => LotteryError::NetworkUnreachable(other.to_string()),
    }
}

fn classify_rpc(err: &TransportError, phase: Phase) -> LotteryError {
    if let Some(payload) = err.as_error_resp() {
        let message = payload.message.to_string();
        if let Some(revert) = payload
            .as_revert_data()
            .and_then(|data| Revert::abi_decode(&data).ok())
        {
            return LotteryError::TransactionRejected(revert.reason);
        }
        return classify_error_message(message, phase);
    }
    match err {
        RpcError::Transport(_) => LotteryError::NetworkUnreachable(err.to_string()),
        _ if phase == Phase::Estimate => {
            LotteryError::GasEstimationFailed(err.to_string())
        }
        _ => LotteryError::UnexpectedResponse(err.to_string()),
    }
}

fn classify_error_message(message: String, phase: Phase) -> LotteryError {
    if let Some(reason) = message.strip_prefix("execution reverted: ") {
        return LotteryError::TransactionRejected(reason.to_string());
    }
    if message.starts_with("execution reverted") {
        return LotteryError::TransactionRejected(message);
    }
    if message.to_ascii_lowercase().contains("insufficient funds") {
        return LotteryError::InsufficientFunds(message);
    }
    match phase {
        Phase::Estimate => LotteryError::GasEstimationFailed(message),
        Phase::Submit => LotteryError::TransactionRejected(message),
        Phase::Read => LotteryError::UnexpectedResponse(message),
    }
}
