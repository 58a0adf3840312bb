//! Ledger address codec
//!
//! An address is 21 bytes: the `0x41` version byte followed by the 20-byte
//! account hash. Three textual forms are accepted:
//!
//! | form        | example                                          |
//! |-------------|--------------------------------------------------|
//! | base58check | `TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t`             |
//! | ledger hex  | `41` + 40 hex digits, any case, optional `0x`    |
//! | EVM hex     | `0x` + 40 hex digits                             |
//!
//! The canonical form sent to nodes is lowercase ledger hex.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SunError};

/// Version byte prepended to every account hash
pub const ADDRESS_PREFIX_BYTE: u8 = 0x41;

/// Version byte as it appears in hex
pub const ADDRESS_PREFIX: &str = "41";

/// Address length in bytes, version byte included
pub const ADDRESS_SIZE: usize = 21;

/// Ledger account or contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Build from the 20-byte account hash
    pub fn from_account_hash(hash: [u8; 20]) -> Self {
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes[0] = ADDRESS_PREFIX_BYTE;
        bytes[1..].copy_from_slice(&hash);
        Self(bytes)
    }

    /// Build from 21 raw bytes; the first byte must be the version byte
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ADDRESS_SIZE || bytes[0] != ADDRESS_PREFIX_BYTE {
            return Err(SunError::InvalidAddress(hex::encode(bytes)));
        }
        let mut out = [0u8; ADDRESS_SIZE];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Parse any accepted textual form
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || SunError::InvalidAddress(input.to_string());

        let unprefixed = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"));

        let hex_body = match unprefixed {
            Some(rest) if rest.len() == 40 => Some(format!("{}{}", ADDRESS_PREFIX, rest)),
            Some(rest) if rest.len() == 42 => Some(rest.to_string()),
            Some(_) => return Err(invalid()),
            None if trimmed.len() == 42 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) => {
                Some(trimmed.to_string())
            }
            None => None,
        };

        if let Some(body) = hex_body {
            let bytes = hex::decode(&body).map_err(|_| invalid())?;
            return Self::from_bytes(&bytes).map_err(|_| invalid());
        }

        if trimmed.len() != 34 {
            return Err(invalid());
        }
        let bytes = bs58::decode(trimmed)
            .with_check(Some(ADDRESS_PREFIX_BYTE))
            .into_vec()
            .map_err(|_| invalid())?;
        Self::from_bytes(&bytes).map_err(|_| invalid())
    }

    /// True if `input` parses in any accepted form
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Raw bytes, version byte included
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// 20-byte account hash without the version byte
    pub fn account_hash(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        out.copy_from_slice(&self.0[1..]);
        out
    }

    /// Canonical lowercase ledger hex (`41…`)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Base58check display form (`T…`)
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// Plain `0x`-prefixed EVM form expected by the ABI codec
    pub fn to_evm_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0[1..]))
    }
}

/// Canonical hex for any accepted address form
pub fn to_canonical_hex(input: &str) -> Result<String> {
    Address::parse(input).map(|a| a.to_hex())
}

impl FromStr for Address {
    type Err = SunError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE58: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
    const HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

    #[test]
    fn test_base58_roundtrip() {
        let addr = Address::parse(BASE58).unwrap();
        assert_eq!(addr.to_base58(), BASE58);
        assert_eq!(addr.as_bytes()[0], ADDRESS_PREFIX_BYTE);
        assert_eq!(addr.to_hex(), HEX);
    }

    #[test]
    fn test_hex_forms_agree() {
        let addr = Address::parse(BASE58).unwrap();
        let hex = addr.to_hex();

        let upper = hex.to_uppercase();
        let prefixed = format!("0x{}", hex);
        let evm = addr.to_evm_hex();

        for variant in [hex.as_str(), upper.as_str(), prefixed.as_str(), evm.as_str()] {
            assert_eq!(to_canonical_hex(variant).unwrap(), hex, "variant {}", variant);
        }
    }

    #[test]
    fn test_rejects_bad_checksum_and_prefix() {
        // last character altered
        assert!(!Address::is_valid("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6u"));
        // wrong version byte
        assert!(!Address::is_valid("42a0b869991c6218b36c1d19d4a2e9eb0ce3606eb4"));
        assert!(!Address::is_valid(""));
        assert!(!Address::is_valid("0x1234"));
    }

    #[test]
    fn test_serde_uses_canonical_hex() {
        let addr = Address::parse(BASE58).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));

        let back: Address = serde_json::from_str(&format!("\"{}\"", BASE58)).unwrap();
        assert_eq!(back, addr);
    }

    proptest! {
        #[test]
        fn prop_every_form_canonicalizes_identically(hash in proptest::array::uniform20(any::<u8>())) {
            let addr = Address::from_account_hash(hash);
            let canonical = addr.to_hex();
            prop_assert_eq!(to_canonical_hex(&addr.to_base58()).unwrap(), canonical.clone());
            prop_assert_eq!(to_canonical_hex(&canonical.to_uppercase()).unwrap(), canonical.clone());
            prop_assert_eq!(to_canonical_hex(&addr.to_evm_hex()).unwrap(), canonical);
        }
    }
}
