//! Best-effort transaction correlation
//!
//! Nothing the tool prints identifies the ledger transaction it submitted, so
//! the correlator looks at the newest block and takes the last transaction
//! sent from the configured account. If none is there it waits and looks at
//! the (then) newest block once more. The hash it returns is advisory: a
//! concurrent transaction from the same account can be picked instead.

use crate::config::PollConfig;
use crate::error::Result;
use crate::retry::poll_fixed;
use crate::traits::{Block, Ledger};
use crate::types::TxHash;

/// Finds the most recent transaction sent by an address
pub struct Correlator<L> {
    ledger: L,
    policy: PollConfig,
}

impl<L: Ledger> Correlator<L> {
    pub fn new(ledger: L, policy: PollConfig) -> Self {
        Self { ledger, policy }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn policy(&self) -> &PollConfig {
        &self.policy
    }

    /// Hash of the latest transaction from `address`, or `None` when no
    /// match turned up or the ledger could not be reached
    pub async fn latest_transaction_from(&self, address: &str) -> Option<TxHash> {
        let found = poll_fixed(&self.policy, |attempt| self.scan_latest_block(address, attempt)).await;
        match found {
            Some(hash) => tracing::info!(address = address, tx = %hash, "Correlated transaction"),
            None => tracing::info!(address = address, "No matching transaction found"),
        }
        found
    }

    async fn scan_latest_block(&self, address: &str, attempt: u32) -> Result<Option<TxHash>> {
        let number = self.ledger.block_number().await?;
        let block = self.ledger.block_with_transactions(number).await?;
        tracing::debug!(
            attempt = attempt,
            block = number,
            transactions = block.transactions.len(),
            "Scanning block for account transactions"
        );
        Ok(last_sent_by(&block, address))
    }
}

/// Last transaction in inclusion order whose sender matches, ignoring case
pub fn last_sent_by(block: &Block, address: &str) -> Option<TxHash> {
    block
        .transactions
        .iter()
        .rev()
        .find(|tx| {
            tx.from
                .as_deref()
                .is_some_and(|from| from.eq_ignore_ascii_case(address))
        })
        .map(|tx| tx.hash)
}
