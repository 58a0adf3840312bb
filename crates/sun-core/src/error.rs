//! Error types for Sun ledger client operations

use thiserror::Error;

/// Result type alias for Sun operations
pub type Result<T> = std::result::Result<T, SunError>;

/// Errors that can occur while building, signing or submitting transactions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SunError {
    // === Local, pre-flight ===
    /// A call argument failed validation. The message names the first violated rule.
    #[error("{0}")]
    Validation(String),

    /// A contract parameter could not be encoded or decoded
    #[error("{0}")]
    Encoding(String),

    /// Address is neither base58check nor ledger hex
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Gateway or client configuration is incomplete or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Private key missing, malformed, or not matching the transaction owner
    #[error("{0}")]
    Signing(String),

    // === Remote ===
    /// The node rejected the request
    #[error("{0}")]
    Remote(String),

    /// The node refused to broadcast a signed transaction
    #[error("Broadcast failed ({code}): {message}")]
    Broadcast { code: String, message: String },

    /// Multisig authorization failure
    #[error("{0}")]
    Permission(String),

    // === Finality ===
    /// Receipt polling exhausted its retry budget
    #[error("Cannot find result in solidity node after {attempts} attempts for {tx_id}")]
    Timeout { attempts: u32, tx_id: String },

    /// Receipt reported an execution failure
    #[error("Transaction {tx_id} failed: {message}")]
    ExecutionFailed { tx_id: String, message: String },

    /// Receipt polling was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    // === Plumbing ===
    /// HTTP transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unexpected JSON shape
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SunError {
    /// Numeric code for CLI exit status and structured logs
    pub fn code(&self) -> u32 {
        match self {
            Self::Validation(_) | Self::InvalidAddress(_) => 1001,
            Self::Encoding(_) => 1002,
            Self::Configuration(_) => 1003,
            Self::Signing(_) => 1004,
            Self::Remote(_) | Self::Broadcast { .. } => 2001,
            Self::Permission(_) => 2002,
            Self::Timeout { .. } => 3001,
            Self::ExecutionFailed { .. } => 3002,
            Self::Cancelled => 3003,
            Self::Transport(_) => 4001,
            Self::Serialization(_) => 4002,
        }
    }

    /// True for errors raised before any request reached the network
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Encoding(_)
                | Self::InvalidAddress(_)
                | Self::Configuration(_)
                | Self::Signing(_)
        )
    }

    /// Check if retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }
}

impl From<serde_json::Error> for SunError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
