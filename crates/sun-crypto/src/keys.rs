//! secp256k1 key management for ledger accounts

use std::fmt;

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sun_core::Address;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::hash::keccak256;

/// Length of an encoded signature: `r ‖ s ‖ v`
pub const SIGNATURE_SIZE: usize = 65;

/// Offset added to the recovery id to form `v`
const RECOVERY_OFFSET: u8 = 27;

/// Account private key
///
/// The inner `SigningKey` zeroizes itself on drop.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    /// Parse 32 bytes of hex, `0x` optional
    pub fn from_hex(s: &str) -> Result<Self> {
        let body = sun_core::strip_0x(s.trim());
        let bytes = Zeroizing::new(
            hex::decode(body).map_err(|_| CryptoError::InvalidSecretKey("not hex".into()))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Build from raw scalar bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidSecretKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidSecretKey("scalar out of range".into()))?;
        Ok(Self { key })
    }

    /// Hex of the scalar; the caller owns the secret from here on
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.to_bytes()))
    }

    /// Uncompressed SEC1 public key (65 bytes, `0x04` prefix)
    pub fn public_key(&self) -> Vec<u8> {
        self.key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Ledger address derived from the public key
    pub fn address(&self) -> Address {
        address_from_public_key(self.key.verifying_key())
    }

    /// Sign a 32-byte digest, returning `r ‖ s ‖ v` with `v = recovery_id + 27`
    pub fn sign_digest(&self, digest: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let mut out = [0u8; SIGNATURE_SIZE];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + RECOVERY_OFFSET;
        Ok(out)
    }

    /// Hex encoded form of [`PrivateKey::sign_digest`]
    pub fn sign_digest_hex(&self, digest: &[u8]) -> Result<String> {
        self.sign_digest(digest).map(hex::encode)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.address())
    }
}

impl std::str::FromStr for PrivateKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

fn address_from_public_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut account = [0u8; 20];
    account.copy_from_slice(&hash[12..]);
    Address::from_account_hash(account)
}

/// Recover the signer address of a 65-byte signature over `digest`
pub fn recover_address(digest: &[u8], signature: &[u8]) -> Result<Address> {
    if signature.len() != SIGNATURE_SIZE {
        return Err(CryptoError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_SIZE,
            signature.len()
        )));
    }
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature[64].wrapping_sub(RECOVERY_OFFSET))
        .ok_or_else(|| CryptoError::InvalidSignature("bad recovery id".into()))?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| CryptoError::VerificationFailed)?;
    Ok(address_from_public_key(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

    #[test]
    fn test_address_derivation_known_vector() {
        let key = PrivateKey::from_hex(KEY_ONE).unwrap();
        let address = key.address();
        assert_eq!(address.to_hex(), "417e5f4552091a69125d5dfcb7b8c2659029395bdf");
        assert_eq!(address.to_base58(), "TMVQGm1qAQYVdetCeGRRkTWYYrLXuHK2HC");
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!(PrivateKey::from_hex("zz").is_err());
        assert!(PrivateKey::from_hex("01").is_err());
        // zero scalar
        assert!(PrivateKey::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_sign_and_recover() {
        let key = PrivateKey::generate();
        let digest = sha256(b"transaction body");

        let signature = key.sign_digest(&digest).unwrap();
        assert!(signature[64] == 27 || signature[64] == 28);

        let recovered = recover_address(&digest, &signature).unwrap();
        assert_eq!(recovered, key.address());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = PrivateKey::from_hex(KEY_ONE).unwrap();
        let digest = sha256(b"same digest");
        assert_eq!(
            key.sign_digest_hex(&digest).unwrap(),
            key.sign_digest_hex(&digest).unwrap()
        );
    }

    #[test]
    fn test_hex_roundtrip_with_prefix() {
        let key = PrivateKey::generate();
        let prefixed = format!("0x{}", key.to_hex().as_str());
        let parsed: PrivateKey = prefixed.parse().unwrap();
        assert_eq!(parsed.address(), key.address());
    }
}
