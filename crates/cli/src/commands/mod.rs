//! Command implementations
//!
//! Every storage command builds a [`StorageClient`] from the config file plus
//! connection flags, runs one operation and renders the result.

pub mod bucket;
pub mod config;
pub mod file;

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use akv_core::{Config, ConfigManager, Correlator, Credentials, Operation, StorageClient};
use akv_ipc::{ProcessRunner, RpcLedger};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, render_operation};

pub type AkvClient = StorageClient<ProcessRunner, RpcLedger>;

/// Connection settings; each overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Storage node address
    #[arg(long, env = "NODE_ADDRESS", global = true)]
    pub node_address: Option<String>,

    /// Private key used to sign storage operations
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    pub private_key: Option<String>,

    /// Account address whose transactions are correlated with mutations
    #[arg(long, env = "ACCOUNT_ADDRESS", global = true)]
    pub account: Option<String>,

    /// Path or name of the Akave command-line tool
    #[arg(long, env = "AKAVE_CLI", global = true)]
    pub binary: Option<String>,

    /// Ledger JSON-RPC endpoint
    #[arg(long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<String>,

    /// Do not look up transaction hashes for mutating operations
    #[arg(long, global = true)]
    pub no_track: bool,

    /// Maximum number of tool processes running at once
    #[arg(long, value_name = "N", global = true)]
    pub max_processes: Option<usize>,
}

impl ConnectionArgs {
    /// Overlay flags and environment onto a loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(v) = &self.node_address {
            config.node_address = Some(v.clone());
        }
        if let Some(v) = &self.private_key {
            config.private_key = Some(v.clone());
        }
        if let Some(v) = &self.account {
            config.account_address = Some(v.clone());
        }
        if let Some(v) = &self.binary {
            config.binary = v.clone();
        }
        if let Some(v) = &self.rpc_url {
            config.rpc_url = v.clone();
        }
        if self.no_track {
            config.correlation.enabled = false;
        }
        if self.max_processes.is_some() {
            config.max_concurrent_processes = self.max_processes;
        }
    }
}

/// Load the config file and apply command-line overrides
pub fn effective_config(connection: &ConnectionArgs) -> anyhow::Result<Config> {
    let manager = ConfigManager::new().context("Failed to locate config directory")?;
    let mut config = manager
        .load()
        .with_context(|| format!("Failed to load {}", manager.path().display()))?;
    connection.apply(&mut config);
    Ok(config)
}

/// Build a client from a validated config
pub fn build_client(config: &Config) -> anyhow::Result<AkvClient> {
    config.validate()?;

    let runner = match config.max_concurrent_processes {
        Some(max) => ProcessRunner::with_max_concurrency(max),
        None => ProcessRunner::new(),
    };
    let credentials = Credentials::new(
        config.node_address.clone().unwrap_or_default(),
        config.private_key.clone().unwrap_or_default(),
    );
    let mut client: AkvClient = StorageClient::new(runner, &config.binary, credentials);

    if config.correlation_enabled()
        && let Some(account) = &config.account_address
    {
        let ledger = RpcLedger::new(&config.rpc_url, config.retry.clone())
            .context("Failed to create ledger client")?;
        let correlator = Correlator::new(ledger, config.correlation.poll.clone());
        client = client.with_correlation(correlator, account);
    } else {
        tracing::debug!("Transaction correlation disabled");
    }

    Ok(client)
}

/// Resolve a ready client or report why not
pub fn setup_client(connection: &ConnectionArgs, formatter: &Formatter) -> Result<AkvClient, ExitCode> {
    let client = effective_config(connection).and_then(|config| build_client(&config));
    client.map_err(|e| {
        formatter.error(&format!("{e:#}"));
        ExitCode::ConfigError
    })
}

/// Await an operation, with a spinner on interactive terminals, and render it
pub async fn run_operation<F>(formatter: &Formatter, message: &str, operation: F) -> ExitCode
where
    F: Future<Output = akv_core::Result<Operation>>,
{
    let spinner = formatter.is_interactive().then(|| {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    });

    let result = operation.await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match result {
        Ok(op) => render_operation(formatter, &op),
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}
