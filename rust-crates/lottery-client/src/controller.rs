use crate::{
    actions::{
        ActionKind,
        InFlight,
    },
    contract::{
        EventSubscription,
        LotteryContract,
    },
    gateway::{
        ChainGateway,
        Connection,
        ContractBinder,
        ContractBinding,
        WalletCapability,
    },
    state::{
        LotterySnapshot,
        Session,
        StateStore,
    },
};
use alloy::primitives::Address;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};
use tokio::sync::watch;
use tracing::{
    info,
    warn,
};

type SharedBinding<B> = Arc<ContractBinding<<B as ContractBinder>::Contract>>;

pub struct LotteryController<W, B: ContractBinder> {
    pub(crate) gateway: ChainGateway<W, B>,
    pub(crate) store: StateStore,
    pub(crate) in_flight: InFlight,
    binding: Mutex<Option<SharedBinding<B>>>,
    subscription: Mutex<Option<EventSubscription>>,
}

impl<W, B: ContractBinder> LotteryController<W, B> {
    pub fn new(gateway: ChainGateway<W, B>) -> Self {
        Self {
            gateway,
            store: StateStore::new(),
            in_flight: InFlight::default(),
            binding: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LotterySnapshot> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> LotterySnapshot {
        self.store.snapshot()
    }

    pub fn is_in_flight(&self, kind: ActionKind) -> bool {
        self.in_flight.is_active(kind)
    }

    pub fn has_event_subscription(&self) -> bool {
        self.lock_subscription()
            .as_ref()
            .is_some_and(EventSubscription::is_active)
    }

    /// The latest binding. Callers keep the returned handle for one pass
    /// only and fetch it again next time.
    pub(crate) fn current_binding(&self) -> Option<SharedBinding<B>> {
        self.lock_binding().clone()
    }

    pub(crate) async fn install(&self, connection: Connection<B::Contract>) {
        let Connection { session, binding } = connection;
        let subscription = match binding.contract.subscribe_events().await {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                warn!(%err, "contract event subscription failed; continuing without event logs");
                None
            }
        };

        self.teardown_binding();
        *self.lock_binding() = Some(Arc::new(binding));
        *self.lock_subscription() = subscription;
        self.store.replace_session(session);
    }

    pub fn disconnect(&self) {
        self.teardown_binding();
        self.store.replace_session(Session::default());
        info!("wallet disconnected");
    }

    fn teardown_binding(&self) {
        if let Some(subscription) = self.lock_subscription().take() {
            subscription.unsubscribe();
        }
        if let Some(previous) = self.lock_binding().take() {
            info!(signer = %previous.signer, "contract binding discarded");
        }
    }

    fn lock_binding(&self) -> MutexGuard<'_, Option<SharedBinding<B>>> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscription(&self) -> MutexGuard<'_, Option<EventSubscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W, B> LotteryController<W, B>
where
    W: WalletCapability,
    B: ContractBinder<Account = W::Account>,
{
    pub fn contract_address(&self) -> Address {
        self.gateway.contract_address()
    }
}
