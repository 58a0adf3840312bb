//! Digest utilities
//!
//! SHA-256 is used for transaction ids and side-chain signing digests,
//! Keccak-256 for address derivation and ABI function selectors.

use k256::sha2::{Digest, Sha256};
use sha3::Keccak256;

/// SHA-256 of `data`
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 over several items, fed in order
pub fn sha256_concat(items: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for item in items {
        hasher.update(item);
    }
    hasher.finalize().into()
}

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the Keccak-256 of a canonical signature,
/// e.g. `transfer(address,uint256)`
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}
