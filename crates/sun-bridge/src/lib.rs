//! # Sun Bridge
//!
//! Moves value between the main chain and an attached side chain through
//! the gateway contracts.
//!
//! ## Flow
//!
//! ```text
//!   deposit_*  ──► main gateway ──► sign(txID)              ──► broadcast
//!   withdraw_* ──► side gateway ──► sign(SHA-256(txID‖chain)) ──► broadcast
//!                                                                  │
//!                                    should_poll_response ──► ReceiptPoller
//!                                                     (20 × 3 s, solidity node)
//! ```
//!
//! TRC20 and TRC721 deposits approve the main gateway first. With a
//! permission id the signer co-signs through the node's sign-weight report.

pub mod config;
pub mod poller;
pub mod sidechain;
pub mod signer;

pub use config::{BridgeGatewayConfig, Gateways};
pub use poller::{ReceiptOutput, ReceiptPoller, Sleeper, TokioSleeper, POLL_ATTEMPTS, POLL_INTERVAL};
pub use sidechain::{BridgeCallOptions, Chain, SendOutcome, SidechainBridge};
pub use signer::{multi_sign, resolve_key, sign, sign_transaction, SignOptions, SigningDomain};

pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::BridgeGatewayConfig;
    pub use crate::sidechain::{BridgeCallOptions, Chain, SendOutcome, SidechainBridge};
    pub use crate::signer::{SignOptions, SigningDomain};
}
