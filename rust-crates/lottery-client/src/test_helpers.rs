use crate::{
    contract::{
        EventSubscription,
        LotteryContract,
        LotteryEvent,
        log_event,
    },
    controller::LotteryController,
    error::{
        LotteryError,
        Result,
    },
    gateway::{
        ChainGateway,
        ContractBinder,
        WalletCapability,
    },
    types::{
        Amount,
        TxReceipt,
    },
};
use alloy::primitives::{
    Address,
    B256,
    U256,
};
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        atomic::{
            AtomicUsize,
            Ordering,
        },
    },
};
use tokio::sync::{
    Semaphore,
    broadcast,
    broadcast::error::RecvError,
};

pub const MINIMUM_STAKE: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

const GAS_PER_CALL: u64 = 21_000;

pub fn player(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn owner() -> Address {
    Address::repeat_byte(0xEE)
}

pub fn ether(milli: u64) -> U256 {
    U256::from(milli) * U256::from(1_000_000_000_000_000u64)
}

pub type FakeController = LotteryController<FakeWallet, FakeBinder>;

pub fn controller(network: &FakeNetwork, wallet: FakeWallet) -> FakeController {
    LotteryController::new(ChainGateway::new(wallet, network.binder()))
}

pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Yields until `condition` holds.
pub async fn until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FakeMethod {
    LotteryId,
    Pot,
    Players,
    HistoryEntry,
    Enter,
    SelectWinner,
    PayWinner,
    Subscribe,
}

struct FakeChain {
    owner: Address,
    lottery_id: u64,
    players: Vec<Address>,
    pot: U256,
    history: BTreeMap<u64, Address>,
    selected: Option<Address>,
    balances: HashMap<Address, U256>,
    reachable: bool,
    failures: HashMap<FakeMethod, LotteryError>,
    history_failures: HashMap<u64, LotteryError>,
    history_reads: Vec<u64>,
    submissions: Vec<(Address, FakeMethod)>,
    binds: usize,
    block: u64,
}

impl FakeChain {
    fn check(&self, method: FakeMethod) -> Result<()> {
        if !self.reachable {
            return Err(LotteryError::NetworkUnreachable(
                "connection refused".to_string(),
            ));
        }
        match self.failures.get(&method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn confirm(&mut self, caller: Address, method: FakeMethod) -> TxReceipt {
        self.block += 1;
        self.submissions.push((caller, method));
        TxReceipt {
            tx_hash: B256::with_last_byte(self.submissions.len() as u8),
            block_number: Some(self.block),
            gas_used: GAS_PER_CALL,
        }
    }

    fn close_round(&mut self, winner: Address) -> U256 {
        let prize = std::mem::take(&mut self.pot);
        self.history.insert(self.lottery_id, winner);
        self.lottery_id += 1;
        self.players.clear();
        self.selected = None;
        prize
    }
}

#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn release(&self) {
        self.0.add_permits(1);
    }
}

#[derive(Clone)]
pub struct FakeNetwork {
    chain: Arc<Mutex<FakeChain>>,
    gates: Arc<Mutex<HashMap<FakeMethod, Arc<Semaphore>>>>,
    events: broadcast::Sender<LotteryEvent>,
    listeners: Arc<AtomicUsize>,
    contract_address: Address,
}

impl Default for FakeNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeNetwork {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            chain: Arc::new(Mutex::new(FakeChain {
                owner: owner(),
                lottery_id: 1,
                players: Vec::new(),
                pot: U256::ZERO,
                history: BTreeMap::new(),
                selected: None,
                balances: HashMap::new(),
                reachable: true,
                failures: HashMap::new(),
                history_failures: HashMap::new(),
                history_reads: Vec::new(),
                submissions: Vec::new(),
                binds: 0,
                block: 0,
            })),
            gates: Arc::new(Mutex::new(HashMap::new())),
            events,
            listeners: Arc::new(AtomicUsize::new(0)),
            contract_address: Address::repeat_byte(0xC0),
        }
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn binder(&self) -> FakeBinder {
        FakeBinder {
            network: self.clone(),
        }
    }

    pub fn contract_as(&self, caller: Address) -> FakeLottery {
        FakeLottery {
            network: self.clone(),
            caller,
        }
    }

    pub fn lottery_id(&self) -> u64 {
        self.chain().lottery_id
    }

    pub fn players(&self) -> Vec<Address> {
        self.chain().players.clone()
    }

    pub fn pot(&self) -> U256 {
        self.chain().pot
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.chain()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    pub fn history_reads(&self) -> Vec<u64> {
        self.chain().history_reads.clone()
    }

    pub fn submissions(&self) -> Vec<(Address, FakeMethod)> {
        self.chain().submissions.clone()
    }

    pub fn submitted(&self, method: FakeMethod) -> usize {
        self.chain()
            .submissions
            .iter()
            .filter(|(_, m)| *m == method)
            .count()
    }

    pub fn binds(&self) -> usize {
        self.chain().binds
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }

    pub fn fund(&self, account: Address, amount: U256) {
        *self.chain().balances.entry(account).or_default() += amount;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.chain().reachable = reachable;
    }

    pub fn fail(&self, method: FakeMethod, err: LotteryError) {
        self.chain().failures.insert(method, err);
    }

    pub fn heal(&self, method: FakeMethod) {
        self.chain().failures.remove(&method);
    }

    pub fn fail_history_round(&self, round_id: u64, err: LotteryError) {
        self.chain().history_failures.insert(round_id, err);
    }

    pub fn add_player(&self, account: Address, stake: U256) {
        let mut chain = self.chain();
        chain.players.push(account);
        chain.pot += stake;
    }

    /// Closes the open round with `winner`, as a draw plus payout would.
    pub fn complete_round(&self, winner: Address) {
        let prize = self.chain().close_round(winner);
        self.fund(winner, prize);
    }

    /// Holds every later call of `method` until the gate is released.
    pub fn hold(&self, method: FakeMethod) -> Gate {
        let semaphore = Arc::new(Semaphore::new(0));
        self.lock_gates().insert(method, semaphore.clone());
        Gate(semaphore)
    }

    /// Removes the gate for `method`; calls already waiting stay held.
    pub fn unhold(&self, method: FakeMethod) {
        self.lock_gates().remove(&method);
    }

    async fn pass(&self, method: FakeMethod) {
        let gate = self.lock_gates().get(&method).cloned();
        if let Some(gate) = gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
    }

    fn chain(&self) -> MutexGuard<'_, FakeChain> {
        self.chain.lock().expect("fake chain lock poisoned")
    }

    fn lock_gates(&self) -> MutexGuard<'_, HashMap<FakeMethod, Arc<Semaphore>>> {
        self.gates.lock().expect("gate lock poisoned")
    }
}

#[derive(Clone)]
pub struct FakeLottery {
    network: FakeNetwork,
    caller: Address,
}

impl FakeLottery {
    pub fn caller(&self) -> Address {
        self.caller
    }

    fn revert(reason: &str) -> LotteryError {
        LotteryError::TransactionRejected(reason.to_string())
    }
}

impl LotteryContract for FakeLottery {
    async fn read_pot(&self) -> Result<Amount> {
        self.network.pass(FakeMethod::Pot).await;
        let chain = self.network.chain();
        chain.check(FakeMethod::Pot)?;
        Ok(Amount::from_wei(chain.pot))
    }

    async fn read_players(&self) -> Result<Vec<Address>> {
        self.network.pass(FakeMethod::Players).await;
        let chain = self.network.chain();
        chain.check(FakeMethod::Players)?;
        Ok(chain.players.clone())
    }

    async fn read_lottery_id(&self) -> Result<u64> {
        self.network.pass(FakeMethod::LotteryId).await;
        let chain = self.network.chain();
        chain.check(FakeMethod::LotteryId)?;
        Ok(chain.lottery_id)
    }

    async fn read_history_entry(&self, round_id: u64) -> Result<Address> {
        self.network.pass(FakeMethod::HistoryEntry).await;
        let mut chain = self.network.chain();
        chain.history_reads.push(round_id);
        chain.check(FakeMethod::HistoryEntry)?;
        if let Some(err) = chain.history_failures.get(&round_id) {
            return Err(err.clone());
        }
        chain
            .history
            .get(&round_id)
            .copied()
            .ok_or(LotteryError::InvalidRound(round_id))
    }

    async fn enter(&self, stake: Amount) -> Result<TxReceipt> {
        self.network.pass(FakeMethod::Enter).await;
        let receipt = {
            let mut chain = self.network.chain();
            chain.check(FakeMethod::Enter)?;
            let balance = chain
                .balances
                .get(&self.caller)
                .copied()
                .unwrap_or_default();
            if balance < stake.wei() {
                return Err(LotteryError::InsufficientFunds(
                    "insufficient funds for gas * price + value".to_string(),
                ));
            }
            if stake.wei() < MINIMUM_STAKE {
                return Err(Self::revert("minimum stake is 0.01 ETH"));
            }
            chain.balances.insert(self.caller, balance - stake.wei());
            chain.players.push(self.caller);
            chain.pot += stake.wei();
            chain.confirm(self.caller, FakeMethod::Enter)
        };
        let _ = self.network.events.send(LotteryEvent::Entered {
            player: self.caller,
            amount: stake,
        });
        Ok(receipt)
    }

    async fn select_winner(&self) -> Result<TxReceipt> {
        self.network.pass(FakeMethod::SelectWinner).await;
        let mut chain = self.network.chain();
        chain.check(FakeMethod::SelectWinner)?;
        if self.caller != chain.owner {
            return Err(Self::revert("unauthorized"));
        }
        if chain.players.is_empty() {
            return Err(Self::revert("no players in this round"));
        }
        let index = chain.lottery_id as usize % chain.players.len();
        chain.selected = Some(chain.players[index]);
        Ok(chain.confirm(self.caller, FakeMethod::SelectWinner))
    }

    async fn pay_winner(&self) -> Result<TxReceipt> {
        self.network.pass(FakeMethod::PayWinner).await;
        let (receipt, winner, prize) = {
            let mut chain = self.network.chain();
            chain.check(FakeMethod::PayWinner)?;
            if self.caller != chain.owner {
                return Err(Self::revert("unauthorized"));
            }
            let Some(winner) = chain.selected else {
                return Err(Self::revert("winner not selected"));
            };
            let prize = chain.close_round(winner);
            *chain.balances.entry(winner).or_default() += prize;
            (chain.confirm(self.caller, FakeMethod::PayWinner), winner, prize)
        };
        let _ = self.network.events.send(LotteryEvent::Winner {
            winner,
            amount: Amount::from_wei(prize),
        });
        Ok(receipt)
    }

    async fn subscribe_events(&self) -> Result<EventSubscription> {
        self.network.pass(FakeMethod::Subscribe).await;
        self.network.chain().check(FakeMethod::Subscribe)?;
        let mut events = self.network.events.subscribe();
        let alive = ListenerGuard::new(self.network.listeners.clone());
        let listener = tokio::spawn(async move {
            let _alive = alive;
            loop {
                match events.recv().await {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Ok(EventSubscription::new(vec![listener]))
    }
}

struct ListenerGuard(Arc<AtomicUsize>);

impl ListenerGuard {
    fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeBinder {
    network: FakeNetwork,
}

impl ContractBinder for FakeBinder {
    type Account = Address;
    type Contract = FakeLottery;

    fn contract_address(&self) -> Address {
        self.network.contract_address
    }

    async fn bind(&self, account: Address) -> Result<FakeLottery> {
        let mut chain = self.network.chain();
        if !chain.reachable {
            return Err(LotteryError::NetworkUnreachable(
                "connection refused".to_string(),
            ));
        }
        chain.binds += 1;
        drop(chain);
        Ok(self.network.contract_as(account))
    }
}

pub struct FakeWallet {
    available: bool,
    rejects: bool,
    accounts: Vec<Address>,
}

impl FakeWallet {
    pub fn absent() -> Self {
        Self {
            available: false,
            rejects: false,
            accounts: Vec::new(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            available: true,
            rejects: true,
            accounts: Vec::new(),
        }
    }

    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            available: true,
            rejects: false,
            accounts,
        }
    }
}

impl WalletCapability for FakeWallet {
    type Account = Address;

    fn is_available(&self) -> bool {
        self.available
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        if self.rejects {
            return Err(LotteryError::UserRejected(
                "user rejected the request".to_string(),
            ));
        }
        Ok(self.accounts.clone())
    }
}
