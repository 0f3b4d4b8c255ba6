//! Data model shared by the executor, parser, correlator and facade

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Logical operation understood by the external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateBucket,
    DeleteBucket,
    ViewBucket,
    ListBuckets,
    ListFiles,
    FileInfo,
    UploadFile,
    DownloadFile,
}

impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        OperationKind::CreateBucket,
        OperationKind::DeleteBucket,
        OperationKind::ViewBucket,
        OperationKind::ListBuckets,
        OperationKind::ListFiles,
        OperationKind::FileInfo,
        OperationKind::UploadFile,
        OperationKind::DownloadFile,
    ];

    /// `(noun, verb)` pair passed to `<binary> ipc`
    pub fn subcommand(self) -> (&'static str, &'static str) {
        match self {
            OperationKind::CreateBucket => ("bucket", "create"),
            OperationKind::DeleteBucket => ("bucket", "delete"),
            OperationKind::ViewBucket => ("bucket", "view"),
            OperationKind::ListBuckets => ("bucket", "list"),
            OperationKind::ListFiles => ("file", "list"),
            OperationKind::FileInfo => ("file", "info"),
            OperationKind::UploadFile => ("file", "upload"),
            OperationKind::DownloadFile => ("file", "download"),
        }
    }

    /// Whether a successful run mutates ledger state and should be correlated
    /// with a transaction
    pub fn is_trackable(self) -> bool {
        matches!(
            self,
            OperationKind::CreateBucket | OperationKind::DeleteBucket | OperationKind::UploadFile
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (noun, verb) = self.subcommand();
        match self {
            OperationKind::ListBuckets => write!(f, "list buckets"),
            OperationKind::ListFiles => write!(f, "list files"),
            OperationKind::FileInfo => write!(f, "file info"),
            _ => write!(f, "{verb} {noun}"),
        }
    }
}

/// Argument vector for one invocation of the external tool
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

const PRIVATE_KEY_FLAG: &str = "--private-key=";

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// Command line suitable for logs, with the credential masked
    pub fn redacted(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.starts_with(PRIVATE_KEY_FLAG) {
                line.push_str(PRIVATE_KEY_FLAG);
                line.push_str("***");
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandSpec").field(&self.redacted()).finish()
    }
}

/// Captured output of one finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// Both streams interleaved in arrival order, trimmed
    pub text: String,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

impl RawOutput {
    pub fn new(combined: &str, stdout: String, stderr: String, exit_code: Option<i32>) -> Self {
        Self {
            text: combined.trim().to_string(),
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Output of a process that only wrote to stdout and exited cleanly
    pub fn from_text(text: &str) -> Self {
        Self::new(text, text.to_string(), String::new(), Some(0))
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Key/value pairs recovered from one grammar line; unknown keys are kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("Name")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn timestamp(&self, keys: &[&str]) -> Option<jiff::Timestamp> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .find_map(|v| v.parse::<jiff::Timestamp>().ok())
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A bucket as printed by `bucket create`, `bucket view` and `bucket list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketRecord(pub Record);

impl BucketRecord {
    pub fn name(&self) -> Option<&str> {
        self.0.name()
    }

    pub fn owner(&self) -> Option<&str> {
        self.0.get("Owner")
    }

    pub fn created_at(&self) -> Option<jiff::Timestamp> {
        self.0.timestamp(&["CreatedAt", "Created"])
    }

    pub fn fields(&self) -> &Record {
        &self.0
    }
}

/// A file as printed by `file info` and `file list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRecord(pub Record);

impl FileRecord {
    pub fn name(&self) -> Option<&str> {
        self.0.name()
    }

    /// Size in bytes, when the tool printed a plain integer
    pub fn size_bytes(&self) -> Option<u64> {
        self.0.get("Size").and_then(|s| s.parse().ok())
    }

    pub fn created_at(&self) -> Option<jiff::Timestamp> {
        self.0.timestamp(&["CreatedAt", "Created"])
    }

    pub fn modified_at(&self) -> Option<jiff::Timestamp> {
        self.0.timestamp(&["ModifiedAt", "Modified", "UpdatedAt"])
    }

    pub fn fields(&self) -> &Record {
        &self.0
    }
}

/// A downloaded object left on disk by the tool; its bytes are never parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passthrough {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Typed result of one operation, one case per output shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ParsedResult {
    Bucket(BucketRecord),
    BucketList(Vec<BucketRecord>),
    File(FileRecord),
    FileList(Vec<FileRecord>),
    Deletion(Record),
    Upload(Record),
    RawPassthrough(Passthrough),
    /// JSON object the tool printed instead of its success line
    ErrorPayload(serde_json::Map<String, serde_json::Value>),
}

impl ParsedResult {
    pub fn is_error_payload(&self) -> bool {
        matches!(self, ParsedResult::ErrorPayload(_))
    }

    /// Human-readable message from an error payload, if one is present
    pub fn error_message(&self) -> Option<String> {
        let ParsedResult::ErrorPayload(map) = self else {
            return None;
        };
        ["error", "message", "msg"]
            .iter()
            .find_map(|k| map.get(*k))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .or_else(|| Some(serde_json::Value::Object(map.clone()).to_string()))
    }
}

/// 32-byte ledger transaction hash
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| format!("Invalid transaction hash '{s}': {e}"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Result handed back to callers: the parsed output plus, for trackable
/// operations, the advisory transaction hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub kind: OperationKind,
    pub result: ParsedResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TxHash>,
}
