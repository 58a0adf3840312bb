//! # Sun Cryptography
//!
//! Cryptographic primitives for ledger accounts:
//! - secp256k1 private keys and recoverable signatures
//! - Address derivation (Keccak-256 of the public key, `0x41` prefix)
//! - SHA-256 and Keccak-256 digests
//!
//! | Function | Algorithm |
//! |----------|-----------|
//! | Signatures | ECDSA secp256k1, `r ‖ s ‖ v` |
//! | Transaction id | SHA-256 |
//! | Addresses, selectors | Keccak-256 |

pub mod error;
pub mod hash;
pub mod keys;

pub use error::*;
pub use hash::*;
pub use keys::*;

/// Cryptographic prelude
pub mod prelude {
    pub use crate::error::{CryptoError, Result};
    pub use crate::hash::{function_selector, keccak256, sha256};
    pub use crate::keys::PrivateKey;
}
