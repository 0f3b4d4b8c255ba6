//! akv-core: Core library for the akv storage client
//!
//! This crate provides the pieces that sit between the Akave IPC command-line
//! tool and its callers:
//! - Output parsing from the tool's line grammars into typed results
//! - Best-effort correlation of mutating operations with ledger transactions
//! - The `StorageClient` facade over bucket and file operations
//! - Configuration management
//!
//! Process spawning and ledger access sit behind the `CommandRunner` and
//! `Ledger` traits so everything here can be tested with mocks.

pub mod client;
pub mod config;
pub mod correlator;
pub mod error;
pub mod parser;
pub mod retry;
pub mod traits;
pub mod types;

pub use client::{Credentials, StorageClient};
pub use config::{Config, ConfigManager, CorrelationConfig, PollConfig, RetryConfig};
pub use correlator::{Correlator, last_sent_by};
pub use error::{Error, Result};
pub use parser::{GRAMMARS, Grammar, Layout, grammar, parse_output};
pub use retry::{is_retryable_error, poll_fixed, retry_with_backoff};
pub use traits::{Block, CommandRunner, Ledger, LedgerTransaction};
pub use types::{
    BucketRecord, CommandSpec, FileRecord, Operation, OperationKind, ParsedResult, Passthrough,
    RawOutput, Record, TxHash,
};
