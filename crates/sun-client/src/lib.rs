//! # Sun Client
//!
//! Builds, validates and encodes operations for the Sun ledger nodes.
//!
//! - `validator` - ordered, first-failure parameter rules
//! - `abi` - contract ABI metadata and the parameter codec seam
//! - `builder` - one operation per ledger action, returning the unsigned
//!   transaction the node assembled
//! - `client` - shared context: transport, codec, identity, ABI cache
//! - `completion` - callback and blocking adapters over the async API
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sun_client::prelude::*;
//!
//! # async fn run() -> sun_core::Result<()> {
//! let transport = Arc::new(HttpTransport::new("https://api.nileex.io", "https://api.nileex.io")?);
//! let client = LedgerClient::new(transport);
//! let tx = client
//!     .transaction_builder()
//!     .send_trx("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", 1_000_000, Some("TMVQGm1qAQYVdetCeGRRkTWYYrLXuHK2HC"), &TxOptions::default())
//!     .await?;
//! println!("{}", tx.tx_id);
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod builder;
pub mod client;
pub mod completion;
pub mod permissions;
pub mod response;
pub mod transport;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use abi::{AbiCodec, AbiEntry, AbiParam, ContractAbi, ParamType, StandardAbiCodec};
pub use builder::*;
pub use client::{ClientBuilder, LedgerClient, DEFAULT_FEE_LIMIT, MAX_FEE_LIMIT};
pub use permissions::check_permissions;
pub use response::{unwrap_as, unwrap_response};
pub use transport::{HttpTransport, NodeKind, NodeTransport};
pub use validator::{Normalized, ParameterValidator, Rule, RuleKind};

#[cfg(any(test, feature = "test-util"))]
pub use transport::{RecordedRequest, RecordingTransport};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::abi::{AbiCodec, ContractAbi};
    pub use crate::builder::{
        CallParameter, DeployOptions, TransactionBuilder, TriggerOptions, TxOptions,
    };
    pub use crate::client::LedgerClient;
    pub use crate::transport::{HttpTransport, NodeKind, NodeTransport};
    pub use sun_core::prelude::*;
}
