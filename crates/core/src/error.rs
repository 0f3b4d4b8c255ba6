//! Error types for akv-core
//!
//! Launch and parse failures are the only errors an operation surfaces to its
//! caller. Ledger errors stay inside the correlator.

use thiserror::Error;

use crate::types::OperationKind;

/// Result type alias for akv-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for akv-core
#[derive(Error, Debug)]
pub enum Error {
    /// The external tool could not be started
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Tool output did not match the grammar of the requested operation
    #[error("Unexpected output for {operation}: {reason}\n--- raw output ---\n{raw}")]
    Parse {
        operation: OperationKind,
        reason: String,
        raw: String,
    },

    /// Ledger transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Ledger node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an argument the tool cannot accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Build a parse error that keeps the raw text for diagnosis
    pub fn parse(operation: OperationKind, reason: impl Into<String>, raw: &str) -> Self {
        Error::Parse {
            operation,
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, Error::Launch { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}
