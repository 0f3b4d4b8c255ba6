//! akv - command-line front end for Akave IPC storage
//!
//! Wraps the Akave command-line tool, turns its output into structured
//! records and links mutations to the ledger transaction they produced.

mod commands;
mod exit_code;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use commands::ConnectionArgs;
use exit_code::ExitCode;
use output::OutputConfig;

#[derive(Parser, Debug)]
#[command(name = "akv", version, about, propagate_version = true)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log tool invocations and ledger queries to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage buckets
    Bucket(commands::bucket::BucketArgs),

    /// Manage files in a bucket
    File(commands::file::FileArgs),

    /// Inspect or create the configuration
    Config(commands::config::ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "akv=debug,akv_core=debug,akv_ipc=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let code = match cli.command {
        Commands::Bucket(args) => commands::bucket::execute(args, &cli.connection, output_config).await,
        Commands::File(args) => commands::file::execute(args, &cli.connection, output_config).await,
        Commands::Config(args) => commands::config::execute(args, &cli.connection, output_config).await,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "akv", &mut std::io::stdout());
            ExitCode::Success
        }
    };

    code.into()
}
