//! Cryptographic error types

use thiserror::Error;

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors in cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Private key is not 32 bytes of hex, or is out of range for secp256k1
    #[error("Invalid private key: {0}")]
    InvalidSecretKey(String),

    /// Digest could not be signed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature bytes are malformed
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Signature does not recover to the expected key
    #[error("Signature verification failed")]
    VerificationFailed,
}

impl From<CryptoError> for sun_core::SunError {
    fn from(err: CryptoError) -> Self {
        sun_core::SunError::Signing(err.to_string())
    }
}
