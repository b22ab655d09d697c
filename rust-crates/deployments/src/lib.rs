use anyhow::{
    Context,
    Result,
    anyhow,
};
use serde::Deserialize;
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    Mainnet,
    Sepolia,
    Local,
}

impl DeploymentEnv {
    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Mainnet => "mainnet",
            DeploymentEnv::Sepolia => "sepolia",
            DeploymentEnv::Local => "local",
        }
    }

    pub fn all() -> [DeploymentEnv; 3] {
        [
            DeploymentEnv::Mainnet,
            DeploymentEnv::Sepolia,
            DeploymentEnv::Local,
        ]
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Mainnet => "Mainnet",
            DeploymentEnv::Sepolia => "Sepolia",
            DeploymentEnv::Local => "Local",
        };
        write!(f, "{name}")
    }
}

/// The canonical lottery deployment for one network.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub contract_address: String,
    pub network_url: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// keccak256 of the deployed runtime bytecode, hex encoded
    #[serde(default)]
    pub code_hash: Option<String>,
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        Self::new_in(DEPLOYMENTS_ROOT, env)
    }

    pub fn new_in(root: impl AsRef<Path>, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        read_record(&self.path)
    }
}

pub fn ensure_structure() -> Result<()> {
    for env in DeploymentEnv::all() {
        let _ = ensure_store(Path::new(DEPLOYMENTS_ROOT), env)?;
    }
    Ok(())
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).with_context(|| {
            format!(
                "Failed to create {}/{} directory",
                root.display(),
                env.dir_name()
            )
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        fs::write(&file_path, b"").with_context(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
    }

    Ok(file_path)
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    if let Ok(record) = serde_json::from_slice::<DeploymentRecord>(&data) {
        return Ok(Some(record));
    }
    if let Ok(mut records) = serde_json::from_slice::<Vec<DeploymentRecord>>(&data) {
        return Ok(records.pop());
    }
    Err(anyhow!(
        "Failed to parse deployment record JSON; expected a single deployment object"
    ))
}
