//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Server binding settings
//! - Ledger database location
//! - Initial administrator
//! - Transfer gateway selection

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth::Address;
use crate::transfer::{DryRunTransferGateway, HttpTransferGateway, TransferGateway};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub admin: AdminConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Identity authorized when the ledger database is first created
    pub initializer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferMode {
    #[default]
    DryRun,
    Http,
}

/// Transfer gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default)]
    pub mode: TransferMode,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::DryRun,
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load from specific path, then apply environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            // Use embedded default config
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")?
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(host) = env_non_empty("LEDGER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_non_empty("LEDGER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = env_non_empty("LEDGER_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(initializer) = env_non_empty("LEDGER_INITIALIZER") {
            self.admin.initializer = initializer;
        }
        if let Some(endpoint) = env_non_empty("LEDGER_TRANSFER_ENDPOINT") {
            self.transfer.mode = TransferMode::Http;
            self.transfer.endpoint = endpoint;
        }
    }

    pub fn initializer(&self) -> Result<Address> {
        Address::parse(&self.admin.initializer).with_context(|| {
            format!(
                "admin.initializer '{}' is not a valid address",
                self.admin.initializer
            )
        })
    }

    /// Build the configured transfer gateway
    pub fn transfer_gateway(&self) -> Result<Arc<dyn TransferGateway>> {
        match self.transfer.mode {
            TransferMode::DryRun => Ok(Arc::new(DryRunTransferGateway)),
            TransferMode::Http => {
                if self.transfer.endpoint.is_empty() {
                    bail!("transfer.mode = \"http\" requires transfer.endpoint");
                }
                let gateway = HttpTransferGateway::new(
                    &self.transfer.endpoint,
                    Some(Duration::from_secs(self.transfer.timeout_secs)),
                );
                info!("Settling transfers through {}", gateway.endpoint());
                Ok(Arc::new(gateway))
            }
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}
