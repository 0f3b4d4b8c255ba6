//! akv-ipc: I/O adapters for akv-core
//!
//! - [`ProcessRunner`] runs the Akave command-line tool as a child process
//! - [`RpcLedger`] reads blocks from the ledger over JSON-RPC

mod process;
mod rpc;

pub use process::ProcessRunner;
pub use rpc::RpcLedger;
