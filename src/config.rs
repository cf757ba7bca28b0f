use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alloy::primitives::B256;
use clap::Parser;
use serde::Deserialize;
use tracing::Level;
use url::Url;

use crate::bond::{BondRegistry, Network, RegistryError};

const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 1;

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long)]
    pub config: PathBuf,
    /// Path to TOML secrets file
    #[clap(long)]
    pub secrets: PathBuf,
}

/// Non-secret settings deserialized from the plaintext config TOML.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    log_level: Option<LogLevel>,
    /// Network the CLI talks to.
    chain_id: u64,
    required_confirmations: Option<u64>,
    networks: Vec<Network>,
}

/// Secret credentials deserialized from the secrets TOML.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Secrets {
    rpc_url: Url,
    /// Signing key. Without it only read-only commands are available.
    private_key: Option<B256>,
}

/// Runtime context assembled from config and secrets.
#[derive(Clone)]
pub struct Ctx {
    pub log_level: LogLevel,
    pub chain_id: u64,
    pub required_confirmations: u64,
    pub registry: Arc<BondRegistry>,
    pub(crate) rpc_url: Url,
    pub(crate) private_key: Option<B256>,
}

impl fmt::Debug for Ctx {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Ctx")
            .field("log_level", &self.log_level)
            .field("chain_id", &self.chain_id)
            .field("required_confirmations", &self.required_confirmations)
            .field("registry", &self.registry)
            .field("rpc_url", &"[REDACTED]")
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("required_confirmations must be at least 1")]
    NoConfirmations,
}

impl Ctx {
    pub fn load_files(config: &Path, secrets: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(config)?;
        let secrets_str = std::fs::read_to_string(secrets)?;
        Self::from_toml(&config_str, &secrets_str)
    }

    pub fn from_toml(config_toml: &str, secrets_toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;
        let secrets: Secrets = toml::from_str(secrets_toml)?;

        let required_confirmations = config
            .required_confirmations
            .unwrap_or(DEFAULT_REQUIRED_CONFIRMATIONS);
        if required_confirmations == 0 {
            return Err(ConfigError::NoConfirmations);
        }

        let registry = BondRegistry::new(config.networks)?;
        registry.network(config.chain_id)?;

        Ok(Self {
            log_level: config.log_level.unwrap_or(LogLevel::Info),
            chain_id: config.chain_id,
            required_confirmations,
            registry: Arc::new(registry),
            rpc_url: secrets.rpc_url,
            private_key: secrets.private_key,
        })
    }
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("bonddesk={level},bonddesk_evm={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
