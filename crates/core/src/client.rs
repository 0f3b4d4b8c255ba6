//! Operation facade
//!
//! `StorageClient` turns each bucket/file verb into one tool invocation,
//! parses the output and, for operations that submit a ledger transaction,
//! attaches the hash the correlator finds. Launch and parse failures reach the
//! caller unchanged; correlation never fails an operation.

use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use crate::correlator::Correlator;
use crate::error::{Error, Result};
use crate::parser::{decode_error_payload, parse_output};
use crate::traits::{CommandRunner, Ledger};
use crate::types::{CommandSpec, Operation, OperationKind, ParsedResult, Passthrough, RawOutput};

/// Node address and signing key passed on every invocation
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub node_address: String,
    pub private_key: String,
}

impl Credentials {
    pub fn new(node_address: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            node_address: node_address.into(),
            private_key: private_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("node_address", &self.node_address)
            .field("private_key", &"***")
            .finish()
    }
}

struct Tracking<L> {
    correlator: Correlator<L>,
    account: String,
}

/// Client for the storage network, driven through the external tool
pub struct StorageClient<R, L> {
    runner: R,
    binary: String,
    credentials: Credentials,
    tracking: Option<Tracking<L>>,
}

impl<R: CommandRunner, L: Ledger> StorageClient<R, L> {
    pub fn new(runner: R, binary: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            runner,
            binary: binary.into(),
            credentials,
            tracking: None,
        }
    }

    /// Attach transaction hashes for `account` to trackable operations
    pub fn with_correlation(mut self, correlator: Correlator<L>, account: impl Into<String>) -> Self {
        self.tracking = Some(Tracking {
            correlator,
            account: account.into(),
        });
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn tracks_transactions(&self) -> bool {
        self.tracking.is_some()
    }

    pub async fn create_bucket(&self, name: &str) -> Result<Operation> {
        check_arg("bucket name", name)?;
        self.execute(OperationKind::CreateBucket, &[name]).await
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<Operation> {
        check_arg("bucket name", name)?;
        self.execute(OperationKind::DeleteBucket, &[name]).await
    }

    pub async fn view_bucket(&self, name: &str) -> Result<Operation> {
        check_arg("bucket name", name)?;
        self.execute(OperationKind::ViewBucket, &[name]).await
    }

    pub async fn list_buckets(&self) -> Result<Operation> {
        self.execute(OperationKind::ListBuckets, &[]).await
    }

    pub async fn list_files(&self, bucket: &str) -> Result<Operation> {
        check_arg("bucket name", bucket)?;
        self.execute(OperationKind::ListFiles, &[bucket]).await
    }

    pub async fn file_info(&self, bucket: &str, name: &str) -> Result<Operation> {
        check_arg("bucket name", bucket)?;
        check_arg("file name", name)?;
        self.execute(OperationKind::FileInfo, &[bucket, name]).await
    }

    /// Upload a file that already exists on the local disk
    pub async fn upload_file(&self, bucket: &str, local_path: &Path) -> Result<Operation> {
        check_arg("bucket name", bucket)?;
        let Some(path) = local_path.to_str() else {
            return Err(Error::InvalidInput(format!(
                "file path '{}' is not valid UTF-8",
                local_path.display()
            )));
        };
        check_arg("file path", path)?;
        self.execute(OperationKind::UploadFile, &[bucket, path]).await
    }

    /// Download `name` into `dest_dir`
    ///
    /// A JSON error printed by the tool wins even if `dest_dir/name` exists.
    /// Otherwise, when the tool leaves that file behind the result points at
    /// it and the bytes are never read here.
    pub async fn download_file(&self, bucket: &str, name: &str, dest_dir: &Path) -> Result<Operation> {
        let kind = OperationKind::DownloadFile;
        check_arg("bucket name", bucket)?;
        check_arg("file name", name)?;
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::InvalidInput(format!(
                "file name '{name}' must not contain path components"
            )));
        }

        let destination = dest_dir.join(name);
        let before = fingerprint(&destination).await;
        let dir = dest_dir.to_string_lossy().into_owned();
        let raw = self.run(kind, &[bucket, name, dir.as_str()]).await?;

        if let Some(payload) = decode_error_payload(&raw.text) {
            return Ok(Operation {
                kind,
                result: ParsedResult::ErrorPayload(payload),
                transaction: None,
            });
        }

        let after = fingerprint(&destination).await;
        if let Some((size_bytes, _)) = after
            && (raw.success() || before != after)
        {
            return Ok(Operation {
                kind,
                result: ParsedResult::RawPassthrough(Passthrough {
                    path: destination,
                    size_bytes,
                }),
                transaction: None,
            });
        }

        Ok(Operation {
            kind,
            result: parse_output(kind, &raw)?,
            transaction: None,
        })
    }

    async fn execute(&self, kind: OperationKind, positional: &[&str]) -> Result<Operation> {
        let raw = self.run(kind, positional).await?;
        let result = parse_output(kind, &raw)?;

        if !raw.success() {
            tracing::warn!(
                operation = %kind,
                exit_code = ?raw.exit_code,
                "Tool exited unsuccessfully but its output was recognised"
            );
        }

        let transaction = match &self.tracking {
            Some(tracking) if kind.is_trackable() && !result.is_error_payload() => {
                tracking
                    .correlator
                    .latest_transaction_from(&tracking.account)
                    .await
            }
            _ => None,
        };

        Ok(Operation {
            kind,
            result,
            transaction,
        })
    }

    async fn run(&self, kind: OperationKind, positional: &[&str]) -> Result<RawOutput> {
        let spec = self.command(kind, positional);
        tracing::debug!(operation = %kind, command = %spec.redacted(), "Running tool");
        let raw = self.runner.run(&spec).await?;
        tracing::debug!(
            operation = %kind,
            exit_code = ?raw.exit_code,
            output_len = raw.text.len(),
            "Tool finished"
        );
        Ok(raw)
    }

    /// `<binary> ipc <noun> <verb> [positional...] --node-address=.. --private-key=..`
    fn command(&self, kind: OperationKind, positional: &[&str]) -> CommandSpec {
        let (noun, verb) = kind.subcommand();
        CommandSpec::new(&self.binary)
            .args(["ipc", noun, verb])
            .args(positional.iter().copied())
            .arg(format!("--node-address={}", self.credentials.node_address))
            .arg(format!("--private-key={}", self.credentials.private_key))
    }
}

fn check_arg(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{what} cannot be empty")));
    }
    if value.starts_with('-') {
        return Err(Error::InvalidInput(format!(
            "{what} '{value}' must not start with '-'"
        )));
    }
    Ok(())
}

async fn fingerprint(path: &Path) -> Option<(u64, Option<SystemTime>)> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    meta.is_file().then(|| (meta.len(), meta.modified().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::traits::{Block, LedgerTransaction, MockCommandRunner, MockLedger};
    use crate::types::TxHash;
    use tempfile::TempDir;

    const ACCOUNT: &str = "0x00000000000000000000000000000000000000aa";

    fn credentials() -> Credentials {
        Credentials::new("connect.akave.ai:5500", "secret-key")
    }

    fn runner_printing(text: &'static str) -> MockCommandRunner {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(move |_| Ok(RawOutput::from_text(text)));
        runner
    }

    fn ledger_with_match() -> MockLedger {
        let mut ledger = MockLedger::new();
        ledger.expect_block_number().returning(|| Ok(42));
        ledger.expect_block_with_transactions().returning(|n| {
            Ok(Block {
                number: n,
                transactions: vec![LedgerTransaction {
                    hash: TxHash::new([0xab; 32]),
                    from: Some(ACCOUNT.to_string()),
                }],
            })
        });
        ledger
    }

    fn untouched_ledger() -> MockLedger {
        let mut ledger = MockLedger::new();
        ledger.expect_block_number().never();
        ledger.expect_block_with_transactions().never();
        ledger
    }

    fn tracked(runner: MockCommandRunner, ledger: MockLedger) -> StorageClient<MockCommandRunner, MockLedger> {
        let poll = PollConfig {
            attempts: 2,
            delay_ms: 0,
        };
        StorageClient::new(runner, "akavecli", credentials())
            .with_correlation(Correlator::new(ledger, poll), ACCOUNT)
    }

    #[tokio::test]
    async fn test_create_bucket_builds_command_and_correlates() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|spec| {
                spec.program() == "akavecli"
                    && spec.argv()
                        == [
                            "ipc",
                            "bucket",
                            "create",
                            "mybucket",
                            "--node-address=connect.akave.ai:5500",
                            "--private-key=secret-key",
                        ]
            })
            .times(1)
            .returning(|_| Ok(RawOutput::from_text("Bucket created: Name=mybucket, Owner=0xabc")));

        let client = tracked(runner, ledger_with_match());
        let op = client.create_bucket("mybucket").await.unwrap();

        assert_eq!(op.kind, OperationKind::CreateBucket);
        assert_eq!(op.transaction, Some(TxHash::new([0xab; 32])));
        let ParsedResult::Bucket(bucket) = op.result else {
            panic!("expected bucket record");
        };
        assert_eq!(bucket.name(), Some("mybucket"));
        assert_eq!(bucket.owner(), Some("0xabc"));
    }

    #[tokio::test]
    async fn test_non_trackable_operations_skip_correlation() {
        let client = tracked(
            runner_printing("Bucket: Name=a, Owner=0x1"),
            untouched_ledger(),
        );
        let op = client.view_bucket("a").await.unwrap();
        assert_eq!(op.transaction, None);

        let client = tracked(runner_printing("File: Name=x"), untouched_ledger());
        assert!(client.list_files("a").await.unwrap().transaction.is_none());
    }

    #[tokio::test]
    async fn test_correlation_miss_still_returns_result() {
        let mut ledger = MockLedger::new();
        ledger.expect_block_number().returning(|| Ok(1));
        ledger
            .expect_block_with_transactions()
            .times(2)
            .returning(|n| Ok(Block { number: n, transactions: Vec::new() }));

        let client = tracked(runner_printing("Bucket deleted: Name=old"), ledger);
        let op = client.delete_bucket("old").await.unwrap();
        assert_eq!(op.transaction, None);
        assert!(matches!(op.result, ParsedResult::Deletion(_)));
    }

    #[tokio::test]
    async fn test_error_payload_is_not_correlated() {
        let client = tracked(
            runner_printing(r#"{"error":"bucket already exists"}"#),
            untouched_ledger(),
        );
        let op = client.create_bucket("dup").await.unwrap();
        assert!(op.result.is_error_payload());
        assert_eq!(op.transaction, None);
    }

    #[tokio::test]
    async fn test_upload_correlates_despite_noise() {
        let client = tracked(
            runner_printing("chunk 1/1 done\nFile uploaded successfully: Name=a.bin, Size=10"),
            ledger_with_match(),
        );
        let op = client
            .upload_file("bucket", Path::new("/tmp/a.bin"))
            .await
            .unwrap();
        assert!(matches!(op.result, ParsedResult::Upload(_)));
        assert!(op.transaction.is_some());
    }

    #[tokio::test]
    async fn test_launch_error_propagates() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().returning(|spec| {
            Err(Error::Launch {
                program: spec.program().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });
        let client = tracked(runner, untouched_ledger());
        assert!(client.create_bucket("b").await.unwrap_err().is_launch());
    }

    #[tokio::test]
    async fn test_parse_error_propagates() {
        let client = tracked(runner_printing("panic: something broke"), untouched_ledger());
        assert!(client.create_bucket("b").await.unwrap_err().is_parse());
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_spawn() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        let client = tracked(runner, untouched_ledger());

        assert!(matches!(
            client.create_bucket("").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            client.view_bucket("--help").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            client
                .download_file("b", "../etc/passwd", Path::new("/tmp"))
                .await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_untracked_client_never_correlates() {
        let client: StorageClient<_, MockLedger> =
            StorageClient::new(runner_printing("Bucket created: Name=a"), "akavecli", credentials());
        assert!(!client.tracks_transactions());
        assert!(client.create_bucket("a").await.unwrap().transaction.is_none());
    }

    #[tokio::test]
    async fn test_download_returns_passthrough_when_file_written() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.bin");
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(move |spec| {
            assert_eq!(spec.argv()[..3], ["ipc", "file", "download"]);
            std::fs::write(&target, b"0123456789").unwrap();
            Ok(RawOutput::from_text("downloading... done"))
        });

        let client = tracked(runner, untouched_ledger());
        let op = client.download_file("bucket", "a.bin", dir.path()).await.unwrap();
        assert_eq!(
            op.result,
            ParsedResult::RawPassthrough(Passthrough {
                path: dir.path().join("a.bin"),
                size_bytes: 10,
            })
        );
        assert!(op.transaction.is_none());
    }

    #[tokio::test]
    async fn test_download_without_file_interprets_error() {
        let dir = TempDir::new().unwrap();
        let client = tracked(
            runner_printing(r#"{"error":"file not found"}"#),
            untouched_ledger(),
        );
        let op = client.download_file("bucket", "missing.bin", dir.path()).await.unwrap();
        assert_eq!(op.result.error_message().as_deref(), Some("file not found"));

        let client = tracked(runner_printing("Error: file not found"), untouched_ledger());
        let err = client
            .download_file("bucket", "missing.bin", dir.path())
            .await
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[tokio::test]
    async fn test_download_error_payload_wins_over_existing_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"old bytes").unwrap();

        let client = tracked(
            runner_printing(r#"{"error":"file not found"}"#),
            untouched_ledger(),
        );
        let op = client.download_file("bucket", "a.bin", dir.path()).await.unwrap();
        assert!(op.result.is_error_payload());
        assert_eq!(op.result.error_message().as_deref(), Some("file not found"));
        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"old bytes");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_upload_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut runner = MockCommandRunner::new();
        runner.expect_run().never();
        let client = tracked(runner, untouched_ledger());

        let path = Path::new(OsStr::from_bytes(b"/tmp/caf\xe9.bin"));
        assert!(matches!(
            client.upload_file("bucket", path).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        assert!(!format!("{:?}", credentials()).contains("secret-key"));
    }
}
