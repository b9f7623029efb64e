use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::utils::Slippage;
use crate::wallet::Network;

pub const CONFIG_ENV: &str = "LUMINA_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "lumina.toml";

const DEFAULT_INBOX_CAPACITY: usize = 64;
const DEFAULT_WORKER_CAPACITY: usize = 32;
const DEFAULT_COMPILE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CALCULATE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EXECUTE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    network: Option<String>,
    token_list_url: Option<String>,
    inbox_capacity: Option<usize>,
    worker_capacity: Option<usize>,
    compile_timeout_secs: Option<u64>,
    calculate_timeout_secs: Option<u64>,
    execute_timeout_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
    default_slippage: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub compile: Duration,
    pub calculate: Duration,
    pub execute: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            compile: Duration::from_secs(DEFAULT_COMPILE_TIMEOUT_SECS),
            calculate: Duration::from_secs(DEFAULT_CALCULATE_TIMEOUT_SECS),
            execute: Duration::from_secs(DEFAULT_EXECUTE_TIMEOUT_SECS),
        }
    }
}

/// Everything the state machine reads from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    pub network: Network,
    pub timeouts: Timeouts,
    pub default_slippage: Slippage,
    pub inbox_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        DexConfig::default().machine_config()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexConfig {
    pub network: Network,
    pub token_list_url: Option<Url>,
    pub inbox_capacity: usize,
    pub worker_capacity: usize,
    pub timeouts: Timeouts,
    pub http_timeout: Duration,
    pub default_slippage: Slippage,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            token_list_url: None,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            worker_capacity: DEFAULT_WORKER_CAPACITY,
            timeouts: Timeouts::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            default_slippage: Slippage::default(),
        }
    }
}

impl DexConfig {
    /// Reads the file named by `LUMINA_CONFIG` (default `lumina.toml`).
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::from_path(&path)
    }

    /// A missing file yields the defaults; any other read error is reported.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        finalize_config(raw)
    }

    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            network: self.network,
            timeouts: self.timeouts,
            default_slippage: self.default_slippage,
            inbox_capacity: self.inbox_capacity,
        }
    }
}

fn finalize_config(raw: RawConfig) -> Result<DexConfig, ConfigError> {
    let defaults = DexConfig::default();
    let network = match raw.network {
        Some(value) => value
            .parse::<Network>()
            .map_err(|e| ConfigError::Invalid(format!("network: {e}")))?,
        None => defaults.network,
    };
    let token_list_url = raw
        .token_list_url
        .map(|value| Url::parse(value.trim()))
        .transpose()
        .map_err(|e| ConfigError::Invalid(format!("token_list_url: {e}")))?;
    let default_slippage = match raw.default_slippage {
        Some(value) => value
            .parse::<Slippage>()
            .map_err(|e| ConfigError::Invalid(format!("default_slippage: {e}")))?,
        None => defaults.default_slippage,
    };

    let inbox_capacity = raw.inbox_capacity.unwrap_or(defaults.inbox_capacity);
    if inbox_capacity == 0 {
        return Err(ConfigError::Invalid("inbox_capacity must be >= 1".into()));
    }
    let worker_capacity = raw.worker_capacity.unwrap_or(defaults.worker_capacity);
    if worker_capacity == 0 {
        return Err(ConfigError::Invalid("worker_capacity must be >= 1".into()));
    }

    let timeouts = Timeouts {
        compile: seconds(raw.compile_timeout_secs, defaults.timeouts.compile, "compile_timeout_secs")?,
        calculate: seconds(
            raw.calculate_timeout_secs,
            defaults.timeouts.calculate,
            "calculate_timeout_secs",
        )?,
        execute: seconds(raw.execute_timeout_secs, defaults.timeouts.execute, "execute_timeout_secs")?,
    };
    let http_timeout = seconds(raw.http_timeout_secs, defaults.http_timeout, "http_timeout_secs")?;

    Ok(DexConfig {
        network,
        token_list_url,
        inbox_capacity,
        worker_capacity,
        timeouts,
        http_timeout,
        default_slippage,
    })
}

fn seconds(value: Option<u64>, default: Duration, field: &str) -> Result<Duration, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::Invalid(format!("{field} must be >= 1"))),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(default),
    }
}
