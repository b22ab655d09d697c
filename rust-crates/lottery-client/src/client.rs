use crate::{
    actions::ActionKind,
    contract::evm::EvmBinder,
    controller::LotteryController,
    error::ActionError,
    gateway::ChainGateway,
    ui,
    wallets::KeystoreWallet,
};
use alloy::primitives::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crossterm::event::EventStream;
use deployments::{
    DeploymentEnv,
    DeploymentStore,
};
use futures::{
    FutureExt,
    StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::{
    error,
    info,
    warn,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::EnvFilter;
use url::Url;

pub const DEFAULT_MAINNET_RPC_URL: &str = "https://ethereum-rpc.publicnode.com";
pub const DEFAULT_SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_LOG_DIR: &str = "logs";

const LOG_FILE_PREFIX: &str = "lottery-client.log";

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    Mainnet { url: String },
    Sepolia { url: String },
    Local { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Mainnet { url }
            | NetworkTarget::Sepolia { url }
            | NetworkTarget::Local { url } => url,
        }
    }

    pub fn deployment_env(&self) -> DeploymentEnv {
        match self {
            NetworkTarget::Mainnet { .. } => DeploymentEnv::Mainnet,
            NetworkTarget::Sepolia { .. } => DeploymentEnv::Sepolia,
            NetworkTarget::Local { .. } => DeploymentEnv::Local,
        }
    }
}

#[derive(Clone, Debug)]
pub enum WalletConfig {
    Keystore { name: Option<String>, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallets: WalletConfig,
    pub contract: Option<Address>,
    pub log_dir: PathBuf,
}

pub type KeystoreController = LotteryController<KeystoreWallet, EvmBinder>;

#[derive(Clone, Debug, PartialEq, Eq)]
struct ContractTarget {
    address: Address,
    chain_id: Option<u64>,
    code_hash: Option<String>,
}

/// The explicit override, or the network's deployment record.
fn resolve_contract(config: &AppConfig) -> Result<ContractTarget> {
    if let Some(address) = config.contract {
        info!(%address, "using contract address from the command line");
        return Ok(ContractTarget {
            address,
            chain_id: None,
            code_hash: None,
        });
    }

    let env = config.network.deployment_env();
    let store = DeploymentStore::new(env).map_err(|e| eyre!(e))?;
    let record = store.load().map_err(|e| eyre!(e))?.ok_or_else(|| {
        eyre!(
            "No {env} deployment recorded in {}; pass --contract <address> instead",
            store.path().display()
        )
    })?;
    let address: Address = record
        .contract_address
        .parse()
        .wrap_err_with(|| format!("Invalid contract address {:?} in deployment record", record.contract_address))?;
    if record.network_url != config.network.url() {
        warn!(
            recorded = %record.network_url,
            configured = %config.network.url(),
            "deployment was recorded against a different RPC URL"
        );
    }
    info!(%address, deployed_at = %record.deployed_at, "using recorded {env} deployment");
    Ok(ContractTarget {
        address,
        chain_id: record.chain_id,
        code_hash: record.code_hash,
    })
}

pub fn build_controller(config: &AppConfig) -> Result<KeystoreController> {
    let rpc_url = Url::parse(config.network.url())
        .wrap_err_with(|| format!("Invalid RPC URL {}", config.network.url()))?;
    let target = resolve_contract(config)?;
    let wallet = match &config.wallets {
        WalletConfig::Keystore { name, dir } => KeystoreWallet::locate(dir, name.as_deref())?,
    };
    let binder = EvmBinder::new(rpc_url, target.address)
        .with_chain_id(target.chain_id)
        .with_code_hash(target.code_hash);
    Ok(LotteryController::new(ChainGateway::new(wallet, binder)))
}

/// Logs go to a daily file in `log_dir`; the terminal belongs to the UI.
pub fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, LOG_FILE_PREFIX));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| eyre!("Failed to install log subscriber: {err}"))?;
    Ok(guard)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let controller = build_controller(&config)?;
    let info = ui::DashboardInfo {
        network: config.network.deployment_env().to_string(),
        contract_address: controller.contract_address(),
    };
    let mut ui_state = ui::UiState::default();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&controller, &mut ui_state, &info).await;
    ui::terminal_exit(&mut ui_state)?;
    controller.disconnect();
    res
}

enum Completed {
    Action(ActionKind, Result<(), ActionError>),
    Refreshed,
}

fn report(kind: ActionKind, outcome: &Result<(), ActionError>) {
    match outcome {
        Ok(()) => info!(action = %kind, "action completed"),
        Err(ActionError::InFlight(_)) => info!(action = %kind, "action ignored; already running"),
        Err(ActionError::Failed(err)) => warn!(action = %kind, %err, "action failed"),
    }
}

fn redraw(
    controller: &KeystoreController,
    ui_state: &mut ui::UiState,
    info: &ui::DashboardInfo,
) -> Result<()> {
    let pending: Vec<ActionKind> = [
        ActionKind::Connect,
        ActionKind::Enter,
        ActionKind::SelectWinner,
        ActionKind::PayWinner,
    ]
    .into_iter()
    .filter(|kind| controller.is_in_flight(*kind))
    .collect();
    ui::draw(ui_state, info, &controller.snapshot(), &pending)
}

async fn run_loop(
    controller: &KeystoreController,
    ui_state: &mut ui::UiState,
    info: &ui::DashboardInfo,
) -> Result<()> {
    tracing::info!("Running app loop");
    let mut snapshots = controller.subscribe();
    let mut input = EventStream::new();
    let mut running: FuturesUnordered<LocalBoxFuture<'_, Completed>> = FuturesUnordered::new();
    redraw(controller, ui_state, info)?;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("state channel closed");
                    break;
                }
                snapshots.borrow_and_update();
                redraw(controller, ui_state, info).wrap_err("draw after state change failed")?;
            }
            Some(done) = running.next(), if !running.is_empty() => {
                if let Completed::Action(kind, outcome) = &done {
                    report(*kind, outcome);
                }
                redraw(controller, ui_state, info).wrap_err("draw after action failed")?;
            }
            _ = tokio::signal::ctrl_c() => break,
            maybe_event = input.next() => {
                let Some(event) = maybe_event else {
                    error!("terminal input closed");
                    break;
                };
                let event = event.wrap_err("reading terminal input failed")?;
                let Some(user_event) = ui::interpret_event(&event) else {
                    continue;
                };
                match user_event {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Connect => {
                        // the password prompt needs the plain terminal and stdin
                        drop(input);
                        ui::terminal_exit(ui_state)?;
                        let outcome = controller.connect().await;
                        ui::terminal_enter(ui_state)?;
                        input = EventStream::new();
                        report(ActionKind::Connect, &outcome);
                    }
                    ui::UserEvent::Disconnect => controller.disconnect(),
                    ui::UserEvent::Enter => running.push(
                        controller
                            .enter()
                            .map(|outcome| Completed::Action(ActionKind::Enter, outcome))
                            .boxed_local(),
                    ),
                    ui::UserEvent::SelectWinner => running.push(
                        controller
                            .select_winner()
                            .map(|outcome| Completed::Action(ActionKind::SelectWinner, outcome))
                            .boxed_local(),
                    ),
                    ui::UserEvent::PayWinner => running.push(
                        controller
                            .pay_winner()
                            .map(|outcome| Completed::Action(ActionKind::PayWinner, outcome))
                            .boxed_local(),
                    ),
                    ui::UserEvent::Refresh => running.push(
                        controller
                            .refresh()
                            .map(|()| Completed::Refreshed)
                            .boxed_local(),
                    ),
                }
                redraw(controller, ui_state, info).wrap_err("draw after input failed")?;
            }
        }
    }
    Ok(())
}
