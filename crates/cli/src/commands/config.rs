//! config command - Inspect and initialise the config file

use clap::{Args, Subcommand};
use serde::Serialize;

use akv_core::{Config, ConfigManager};

use super::{ConnectionArgs, effective_config};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Inspect or create the configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (private key masked)
    Show,

    /// Print the config file location
    Path,

    /// Write a config file from defaults and the given flags
    Init(InitArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

/// Config as shown to users: the key is never printed
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigView<'a> {
    binary: &'a str,
    node_address: Option<&'a str>,
    private_key: Option<&'static str>,
    account_address: Option<&'a str>,
    rpc_url: &'a str,
    max_concurrent_processes: Option<usize>,
    correlation_enabled: bool,
    correlation_attempts: u32,
    correlation_delay_ms: u64,
}

impl<'a> From<&'a Config> for ConfigView<'a> {
    fn from(config: &'a Config) -> Self {
        Self {
            binary: &config.binary,
            node_address: config.node_address.as_deref(),
            private_key: config.private_key.as_ref().map(|_| "***"),
            account_address: config.account_address.as_deref(),
            rpc_url: &config.rpc_url,
            max_concurrent_processes: config.max_concurrent_processes,
            correlation_enabled: config.correlation_enabled(),
            correlation_attempts: config.correlation.poll.attempts,
            correlation_delay_ms: config.correlation.poll.delay_ms,
        }
    }
}

/// Execute the config command
pub async fn execute(args: ConfigArgs, connection: &ConnectionArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ConfigManager::new() {
        Ok(m) => m,
        Err(e) => {
            formatter.error(&format!("Failed to locate config directory: {e}"));
            return ExitCode::ConfigError;
        }
    };

    match args.command {
        ConfigCommands::Show => execute_show(connection, &formatter),
        ConfigCommands::Path => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({ "path": manager.path() }));
            } else {
                formatter.println(&manager.path().display().to_string());
            }
            ExitCode::Success
        }
        ConfigCommands::Init(init) => execute_init(init, connection, &manager, &formatter),
    }
}

fn execute_show(connection: &ConnectionArgs, formatter: &Formatter) -> ExitCode {
    let config = match effective_config(connection) {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return ExitCode::ConfigError;
        }
    };

    let view = ConfigView::from(&config);
    if formatter.is_json() {
        formatter.json(&view);
        return ExitCode::Success;
    }

    let unset = || formatter.style_date("(unset)");
    let rows = [
        ("binary", view.binary.to_string()),
        ("node address", view.node_address.map(str::to_string).unwrap_or_else(unset)),
        ("private key", view.private_key.map(str::to_string).unwrap_or_else(unset)),
        ("account", view.account_address.map(str::to_string).unwrap_or_else(unset)),
        ("rpc url", view.rpc_url.to_string()),
        (
            "max processes",
            view.max_concurrent_processes
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unlimited".to_string()),
        ),
        (
            "correlation",
            if view.correlation_enabled {
                format!(
                    "{} attempts, {} ms apart",
                    view.correlation_attempts, view.correlation_delay_ms
                )
            } else {
                "disabled".to_string()
            },
        ),
    ];
    for (key, value) in rows {
        let label = formatter.style_key(&format!("{key:<14}"));
        formatter.println(&format!("{label} {value}"));
    }
    ExitCode::Success
}

fn execute_init(
    args: InitArgs,
    connection: &ConnectionArgs,
    manager: &ConfigManager,
    formatter: &Formatter,
) -> ExitCode {
    if manager.path().exists() && !args.force {
        formatter.error(&format!(
            "{} already exists (use --force to overwrite)",
            manager.path().display()
        ));
        return ExitCode::UsageError;
    }

    let mut config = Config::default();
    connection.apply(&mut config);

    match manager.save(&config) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({
                    "success": true,
                    "path": manager.path(),
                }));
            } else {
                formatter.success(&format!("Wrote {}", manager.path().display()));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to write config: {e}"));
            ExitCode::ConfigError
        }
    }
}
