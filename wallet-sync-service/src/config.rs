use anyhow::{Context, Result};
use serde::Deserialize;
use wallet_sync_connector::config::SyncConfig;
use wallet_sync_logger::LogConfig;

/// Prefix of environment variables that override file settings,
/// e.g. `WALLET_SYNC__SERVICE__LOG__LEVEL=debug`.
pub const ENV_PREFIX: &str = "WALLET_SYNC";

/// The top-level configuration for the wallet-sync service.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    #[serde(default)]
    pub connector: SyncConfig,
    #[serde(default)]
    pub service: ServiceSpecificConfig,
}

/// Contains settings that are unique to the service binary.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceSpecificConfig {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// JSON-RPC node connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct NodeConfig {
    pub rpc_url: String,
    pub timeout_secs: u64,
    /// ERC-20 contract queried for token balances. Without it token balances are zero.
    pub token_contract: Option<String>,
}

/// Downstream ledger endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LedgerConfig {
    pub base_url: String,
    pub transactions_path: String,
    pub balances_path: String,
    pub timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 30,
            token_contract: None,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            transactions_path: "/wallet/transactions".to_string(),
            balances_path: "/wallet/balances".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LedgerConfig {
    pub fn transactions_url(&self) -> String {
        join_url(&self.base_url, &self.transactions_path)
    }

    pub fn balances_url(&self) -> String {
        join_url(&self.base_url, &self.balances_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Loads the service configuration.
///
/// Layers, lowest first: built-in defaults, the TOML file at `path` (if given),
/// and `WALLET_SYNC__*` environment variables.
pub fn load_config(path: Option<&str>) -> Result<ServiceConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    }
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

    let source = path.unwrap_or("<environment>");
    let settings: ServiceConfig = builder
        .build()
        .context(format!("Failed to build configuration from '{}'", source))?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(settings)
}
