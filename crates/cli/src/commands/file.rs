//! file command - List, inspect, upload and download files

use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::{ConnectionArgs, run_operation, setup_client};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Manage files in a bucket
#[derive(Args, Debug)]
pub struct FileArgs {
    #[command(subcommand)]
    pub command: FileCommands,
}

#[derive(Subcommand, Debug)]
pub enum FileCommands {
    /// List files in a bucket
    List(ListArgs),

    /// Show file details
    Info(FileRefArgs),

    /// Upload a local file
    Upload(UploadArgs),

    /// Download a file into a local directory
    Download(DownloadArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Bucket name
    pub bucket: String,
}

#[derive(Args, Debug)]
pub struct FileRefArgs {
    /// Bucket name
    pub bucket: String,

    /// File name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Bucket name
    pub bucket: String,

    /// Local file to upload
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Bucket name
    pub bucket: String,

    /// File name
    pub name: String,

    /// Destination directory
    #[arg(short, long, default_value = "downloads")]
    pub output: PathBuf,
}

/// Execute the file command
pub async fn execute(args: FileArgs, connection: &ConnectionArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    if let Err(message) = check_local_paths(&args.command) {
        formatter.error(&message);
        return ExitCode::UsageError;
    }

    let client = match setup_client(connection, &formatter) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match args.command {
        FileCommands::List(list) => {
            run_operation(&formatter, "Listing files...", client.list_files(&list.bucket)).await
        }
        FileCommands::Info(file) => {
            run_operation(
                &formatter,
                "Fetching file info...",
                client.file_info(&file.bucket, &file.name),
            )
            .await
        }
        FileCommands::Upload(upload) => {
            let message = format!("Uploading '{}'...", upload.path.display());
            run_operation(
                &formatter,
                &message,
                client.upload_file(&upload.bucket, &upload.path),
            )
            .await
        }
        FileCommands::Download(download) => {
            if let Err(e) = tokio::fs::create_dir_all(&download.output).await {
                formatter.error(&format!(
                    "Failed to create '{}': {e}",
                    download.output.display()
                ));
                return ExitCode::GeneralError;
            }
            let message = format!("Downloading '{}'...", download.name);
            run_operation(
                &formatter,
                &message,
                client.download_file(&download.bucket, &download.name, &download.output),
            )
            .await
        }
    }
}

/// Catch missing local files before spawning the tool
fn check_local_paths(command: &FileCommands) -> Result<(), String> {
    match command {
        FileCommands::Upload(upload) if !upload.path.is_file() => Err(format!(
            "'{}' is not a readable file",
            upload.path.display()
        )),
        FileCommands::Download(download) if download.output.is_file() => Err(format!(
            "Destination '{}' is a file, expected a directory",
            download.output.display()
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let missing = FileCommands::Upload(UploadArgs {
            bucket: "b".to_string(),
            path: dir.path().join("missing.bin"),
        });
        assert!(check_local_paths(&missing).is_err());

        let present = dir.path().join("present.bin");
        std::fs::write(&present, b"data").unwrap();
        let ok = FileCommands::Upload(UploadArgs {
            bucket: "b".to_string(),
            path: present,
        });
        assert!(check_local_paths(&ok).is_ok());
    }

    #[test]
    fn test_download_destination_must_not_be_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, b"").unwrap();
        let command = FileCommands::Download(DownloadArgs {
            bucket: "b".to_string(),
            name: "a.bin".to_string(),
            output: file,
        });
        assert!(check_local_paths(&command).is_err());
    }
}
