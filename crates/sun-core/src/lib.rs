//! # Sun Core
//!
//! Data model for the Sun ledger client.
//!
//! This crate provides the types every other crate in the workspace speaks:
//! - `Address` - ledger address codec (base58check, ledger hex, EVM hex)
//! - `Transaction` - candidate transaction in the node's JSON shape
//! - `PermissionSet`, `SignWeightResult` - multisignature policy and reports
//! - `TriggerResult`, `BroadcastResult`, `TransactionInfo` - node responses
//! - `SunError` - the error taxonomy shared by client and bridge
//!
//! ## Transaction lifecycle
//!
//! ```text
//!   validate ──► build (node) ──► sign ──► broadcast ──► poll receipt
//!      │             │              │           │              │
//!   local err   Remote err    Signing err  Broadcast err  Timeout/Failed
//! ```

pub mod address;
pub mod encoding;
pub mod error;
pub mod transaction;
pub mod types;

pub use address::*;
pub use encoding::*;
pub use error::*;
pub use transaction::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::address::{to_canonical_hex, Address};
    pub use crate::error::{Result, SunError};
    pub use crate::transaction::{ContractDescriptor, RawData, Transaction};
    pub use crate::types::*;
}
