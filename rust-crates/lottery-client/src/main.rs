use alloy::primitives::Address;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use lottery_client::{
    client,
    wallets,
};
use std::path::PathBuf;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: lottery-client [--mainnet | --sepolia | --local] [--rpc-url <url>]\n\
         [--wallet <name>] [--wallet-dir <path>] [--contract <address>] [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --mainnet            Connect to Ethereum mainnet (default RPC {})\n\
           --sepolia            Connect to the Sepolia testnet (default RPC {})\n\
           --local              Connect to a local node (default RPC {})\n\
           --rpc-url <url>      Override the RPC URL for the selected network\n\
           --wallet <name>      Keystore to sign with (defaults to the first one found)\n\
           --wallet-dir <path>  Keystore directory (defaults to ~/.lottery/keystores)\n\
           --contract <address> Lottery contract address (defaults to the deployment record)\n\
           --log-dir <path>     Directory for log files (defaults to ./{})\n\
         \n\
         Environment:\n\
           {}  Keystore password; prompted for when unset\n\
           RUST_LOG                 Log filter (defaults to info)",
        client::DEFAULT_MAINNET_RPC_URL,
        client::DEFAULT_SEPOLIA_RPC_URL,
        client::DEFAULT_LOCAL_RPC_URL,
        client::DEFAULT_LOG_DIR,
        wallets::PASSWORD_ENV_VAR,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    #[derive(Clone, Copy)]
    enum NetworkFlag {
        Mainnet,
        Sepolia,
        Local,
    }

    let mut args = std::env::args().skip(1);
    let mut network_flag: Option<NetworkFlag> = None;
    let mut custom_url: Option<String> = None;
    let mut wallet_dir: Option<String> = None;
    let mut wallet_name: Option<String> = None;
    let mut contract: Option<Address> = None;
    let mut log_dir: Option<String> = None;

    while let Some(arg) = args.next() {
        let flag = match arg.as_str() {
            "--mainnet" => Some(NetworkFlag::Mainnet),
            "--sepolia" => Some(NetworkFlag::Sepolia),
            "--local" => Some(NetworkFlag::Local),
            _ => None,
        };
        if let Some(flag) = flag {
            if network_flag.is_some() {
                return Err(eyre!(
                    "Multiple network flags provided; choose one of --mainnet/--sepolia/--local"
                ));
            }
            network_flag = Some(flag);
            continue;
        }

        match arg.as_str() {
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if custom_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                if network_flag.is_none() {
                    return Err(eyre!(
                        "--rpc-url must follow a network flag (--mainnet/--sepolia/--local)"
                    ));
                }
                custom_url = Some(url);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                wallet_dir = Some(dir);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                wallet_name = Some(name);
            }
            "--contract" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--contract requires an address argument"))?;
                if contract.is_some() {
                    return Err(eyre!("--contract may only be specified once"));
                }
                let address = raw
                    .parse::<Address>()
                    .wrap_err_with(|| format!("Invalid contract address {raw}"))?;
                contract = Some(address);
            }
            "--log-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--log-dir requires a path argument"))?;
                if log_dir.is_some() {
                    return Err(eyre!("--log-dir may only be specified once"));
                }
                log_dir = Some(dir);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let network = match network_flag {
        None => {
            return Err(eyre!(
                "Select a network with --mainnet, --sepolia, or --local"
            ));
        }
        Some(NetworkFlag::Mainnet) => client::NetworkTarget::Mainnet {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_MAINNET_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Sepolia) => client::NetworkTarget::Sepolia {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_SEPOLIA_RPC_URL.to_string()),
        },
        Some(NetworkFlag::Local) => client::NetworkTarget::Local {
            url: custom_url.unwrap_or_else(|| client::DEFAULT_LOCAL_RPC_URL.to_string()),
        },
    };

    let dir = wallets::resolve_wallet_dir(wallet_dir.as_deref())?;
    let log_dir = log_dir
        .map(|raw| PathBuf::from(shellexpand::tilde(&raw).into_owned()))
        .unwrap_or_else(|| PathBuf::from(client::DEFAULT_LOG_DIR));

    Ok(client::AppConfig {
        network,
        wallets: client::WalletConfig::Keystore {
            name: wallet_name,
            dir,
        },
        contract,
        log_dir,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app_config = parse_cli_args()?;
    let _log_guard = client::init_tracing(&app_config.log_dir)?;
    tracing::info!("starting lottery client");
    deployments::ensure_structure().map_err(|e| eyre!(e))?;
    client::run_app(app_config).await
}
