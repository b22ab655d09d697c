use crate::{
    error::LotteryError,
    gateway::WalletCapability,
};
use alloy::signers::local::PrivateKeySigner;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::{
    KeystoreError,
    decrypt_key,
};
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};
use tracing::{
    info,
    warn,
};

pub const PASSWORD_ENV_VAR: &str = "LOTTERY_WALLET_PASSWORD";

const KEYSTORE_EXTENSION: &str = "json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl WalletDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".lottery").join("keystores"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

pub fn list_wallets(dir: &Path) -> Result<Vec<WalletDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut wallets = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read wallet directory")? {
        let entry = entry.wrap_err("Failed to read wallet entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(KEYSTORE_EXTENSION) {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        wallets.push(WalletDescriptor::new(name, path));
    }
    wallets.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(wallets)
}

pub fn find_wallet(dir: &Path, name: &str) -> Result<Option<WalletDescriptor>> {
    Ok(list_wallets(dir)?.into_iter().find(|w| w.name == name))
}

/// Prompts for the keystore password (or takes it from the environment)
/// and decrypts the signing key.
pub fn unlock_wallet(descriptor: &WalletDescriptor) -> Result<PrivateKeySigner, LotteryError> {
    let password = match std::env::var(PASSWORD_ENV_VAR) {
        Ok(password) => password,
        Err(_) => {
            let prompt = format!("Enter password for wallet '{}': ", descriptor.name);
            prompt_password(prompt).map_err(|err| {
                LotteryError::WalletUnavailable(format!("failed to read wallet password: {err}"))
            })?
        }
    };
    unlock_with_password(descriptor, &password)
}

pub fn unlock_with_password(
    descriptor: &WalletDescriptor,
    password: &str,
) -> Result<PrivateKeySigner, LotteryError> {
    if password.is_empty() {
        return Err(LotteryError::UserRejected(format!(
            "no password given for wallet '{}'",
            descriptor.name
        )));
    }
    let secret = decrypt_key(&descriptor.path, password).map_err(|err| match err {
        KeystoreError::MacMismatch => LotteryError::UserRejected(format!(
            "invalid password for wallet '{}'",
            descriptor.name
        )),
        other => LotteryError::WalletUnavailable(format!(
            "wallet '{}' could not be read: {other}",
            descriptor.name
        )),
    })?;
    PrivateKeySigner::from_slice(&secret).map_err(|err| {
        LotteryError::WalletUnavailable(format!(
            "wallet '{}' contained unsupported key material: {err}",
            descriptor.name
        ))
    })
}

#[derive(Clone, Debug)]
pub struct KeystoreWallet {
    descriptor: Option<WalletDescriptor>,
}

impl KeystoreWallet {
    pub fn new(descriptor: Option<WalletDescriptor>) -> Self {
        Self { descriptor }
    }

    pub fn locate(dir: &Path, name: Option<&str>) -> Result<Self> {
        let descriptor = match name {
            Some(name) => find_wallet(dir, name)?,
            None => list_wallets(dir)?.into_iter().next(),
        };
        match &descriptor {
            Some(found) => info!(wallet = %found.name, path = ?found.path, "keystore selected"),
            None => warn!(dir = ?dir, ?name, "no keystore found"),
        }
        Ok(Self::new(descriptor))
    }
}

impl WalletCapability for KeystoreWallet {
    type Account = PrivateKeySigner;

    fn is_available(&self) -> bool {
        self.descriptor
            .as_ref()
            .is_some_and(|descriptor| descriptor.path.is_file())
    }

    async fn request_accounts(&self) -> Result<Vec<PrivateKeySigner>, LotteryError> {
        let Some(descriptor) = self.descriptor.clone() else {
            return Err(LotteryError::WalletUnavailable(
                "no keystore selected".to_string(),
            ));
        };
        let signer = tokio::task::spawn_blocking(move || unlock_wallet(&descriptor))
            .await
            .map_err(|err| {
                LotteryError::WalletUnavailable(format!("wallet unlock was interrupted: {err}"))
            })??;
        Ok(vec![signer])
    }
}
