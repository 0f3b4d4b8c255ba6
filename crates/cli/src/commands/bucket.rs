//! bucket command - Create, inspect and remove buckets

use clap::{Args, Subcommand};

use super::{ConnectionArgs, run_operation, setup_client};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Manage buckets
#[derive(Args, Debug)]
pub struct BucketArgs {
    #[command(subcommand)]
    pub command: BucketCommands,
}

#[derive(Subcommand, Debug)]
pub enum BucketCommands {
    /// Create a bucket
    Create(BucketNameArg),

    /// Delete a bucket
    Delete(BucketNameArg),

    /// Show bucket details
    View(BucketNameArg),

    /// List all buckets
    List,
}

#[derive(Args, Debug)]
pub struct BucketNameArg {
    /// Bucket name
    pub name: String,
}

/// Execute the bucket command
pub async fn execute(
    args: BucketArgs,
    connection: &ConnectionArgs,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match setup_client(connection, &formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match args.command {
        BucketCommands::Create(arg) => {
            let message = format!("Creating bucket '{}'...", arg.name);
            run_operation(&formatter, &message, client.create_bucket(&arg.name)).await
        }
        BucketCommands::Delete(arg) => {
            let message = format!("Deleting bucket '{}'...", arg.name);
            run_operation(&formatter, &message, client.delete_bucket(&arg.name)).await
        }
        BucketCommands::View(arg) => {
            run_operation(&formatter, "Fetching bucket...", client.view_bucket(&arg.name)).await
        }
        BucketCommands::List => {
            run_operation(&formatter, "Listing buckets...", client.list_buckets()).await
        }
    }
}
