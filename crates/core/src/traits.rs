//! Seams between the core and its I/O adapters
//!
//! These traits keep the facade and correlator independent of how processes
//! are spawned or how the ledger is reached, so both can be exercised with
//! mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{CommandSpec, RawOutput, TxHash};

/// Runs one invocation of the external tool to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Spawn the process, capture both streams and wait for it to exit.
    ///
    /// Fails with [`crate::Error::Launch`] when the process cannot start.
    /// A non-zero exit status is reported in [`RawOutput::exit_code`], not as
    /// an error.
    async fn run(&self, spec: &CommandSpec) -> Result<RawOutput>;
}

/// A transaction as seen in a block body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub hash: TxHash,
    /// Sender address as reported by the node; casing is not normalised
    pub from: Option<String>,
}

/// A block with its transaction bodies, in inclusion order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub transactions: Vec<LedgerTransaction>,
}

/// Read-only view of the ledger needed for correlation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Height of the most recent block
    async fn block_number(&self) -> Result<u64>;

    /// Block at `number`, including full transaction bodies
    async fn block_with_transactions(&self, number: u64) -> Result<Block>;
}
