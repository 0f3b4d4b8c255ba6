//! Configuration management
//!
//! Settings live in `config.toml` under the platform config directory
//! (`~/.config/akv` on Linux), or under `AKV_CONFIG_DIR` when set. A missing
//! file means defaults; credentials usually arrive through CLI flags or the
//! environment instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Public JSON-RPC endpoint of the Akave Fuji chain
pub const DEFAULT_RPC_URL: &str = "https://node1-asia.ava.akave.ai/ext/bc/tLqcnkJkZ1DgyLyWmborZK9d7NmMj6YCzCFmf9d9oQEd2fHon/rpc";

/// Name of the external tool looked up on `PATH`
pub const DEFAULT_BINARY: &str = "akavecli";

/// Upper bound on a single retry sleep
pub const MAX_BACKOFF_MS: u64 = 60_000;

const CONFIG_DIR_ENV: &str = "AKV_CONFIG_DIR";
const CONFIG_FILE: &str = "config.toml";

/// Client configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Executable invoked for every operation
    pub binary: String,

    /// Storage node address passed as `--node-address`
    pub node_address: Option<String>,

    /// Signing key passed as `--private-key`
    pub private_key: Option<String>,

    /// Account whose transactions are correlated with mutating operations
    pub account_address: Option<String>,

    /// Ledger JSON-RPC endpoint
    pub rpc_url: String,

    /// Upper bound on concurrently running tool processes; unbounded when absent
    pub max_concurrent_processes: Option<usize>,

    pub correlation: CorrelationConfig,

    /// Retry policy for ledger RPC requests
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            node_address: None,
            private_key: None,
            account_address: None,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            max_concurrent_processes: None,
            correlation: CorrelationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("binary", &self.binary)
            .field("node_address", &self.node_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .field("account_address", &self.account_address)
            .field("rpc_url", &self.rpc_url)
            .field("max_concurrent_processes", &self.max_concurrent_processes)
            .field("correlation", &self.correlation)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Config {
    /// Check that everything an operation needs is present and well formed
    pub fn validate(&self) -> Result<()> {
        if self.binary.trim().is_empty() {
            return Err(Error::Config("binary cannot be empty".to_string()));
        }
        if self.node_address.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(Error::Config(
                "node address is not set (NODE_ADDRESS or --node-address)".to_string(),
            ));
        }
        if self.private_key.as_deref().is_none_or(|s| s.trim().is_empty()) {
            return Err(Error::Config(
                "private key is not set (PRIVATE_KEY or --private-key)".to_string(),
            ));
        }
        if let Some(address) = &self.account_address
            && !is_account_address(address)
        {
            return Err(Error::Config(format!(
                "account address '{address}' is not a 0x-prefixed 20-byte hex address"
            )));
        }
        if self.max_concurrent_processes == Some(0) {
            return Err(Error::Config(
                "max_concurrent_processes must be at least 1".to_string(),
            ));
        }
        if self.retry.max_backoff_ms > MAX_BACKOFF_MS {
            return Err(Error::Config(format!(
                "retry.max_backoff_ms must be at most {MAX_BACKOFF_MS}"
            )));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::Config(
                "retry.initial_backoff_ms cannot exceed retry.max_backoff_ms".to_string(),
            ));
        }
        url::Url::parse(&self.rpc_url)
            .map_err(|e| Error::Config(format!("invalid rpc_url '{}': {e}", self.rpc_url)))?;
        Ok(())
    }

    /// Whether mutating operations should look for a matching transaction
    pub fn correlation_enabled(&self) -> bool {
        self.correlation.enabled && self.correlation.poll.attempts > 0 && self.account_address.is_some()
    }
}

fn is_account_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Correlation of mutating operations with ledger transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub poll: PollConfig,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll: PollConfig::default(),
        }
    }
}

/// Fixed-delay polling policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Total lookups, including the first
    pub attempts: u32,
    /// Pause between lookups in milliseconds
    pub delay_ms: u64,
}

impl PollConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay_ms: 5000,
        }
    }
}

/// Exponential backoff policy for transient ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
        }
    }
}

/// Loads and stores [`Config`] on disk
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("cannot determine config directory".to_string()))?
                .join("akv"),
        };
        Ok(Self::with_dir(dir))
    }

    /// Manager for a config file inside `dir`
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file, falling back to defaults when it does not exist
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}
