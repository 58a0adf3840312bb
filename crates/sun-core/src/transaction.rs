//! Transaction model in the node's JSON shape
//!
//! Unknown fields are carried through untouched so that a transaction
//! returned by a node can be signed and broadcast back byte-for-byte.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::to_canonical_hex;

/// A candidate ledger transaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// SHA-256 of `raw_data_hex`
    #[serde(rename = "txID")]
    pub tx_id: String,

    /// Transaction body
    pub raw_data: RawData,

    /// Protobuf encoding of `raw_data`
    #[serde(default)]
    pub raw_data_hex: String,

    /// Hex signatures, ordered and duplicate-free
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<String>,

    /// Whether addresses inside are in display (base58) form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Transaction body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawData {
    /// Operation descriptors; the ledger only ever uses the first
    #[serde(default)]
    pub contract: Vec<ContractDescriptor>,

    #[serde(default)]
    pub ref_block_bytes: String,

    #[serde(default)]
    pub ref_block_hash: String,

    /// Expiration in milliseconds since the epoch
    #[serde(default)]
    pub expiration: i64,

    /// Creation time in milliseconds since the epoch
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_limit: Option<i64>,

    /// Arbitrary memo, hex encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One operation inside a transaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub parameter: ContractParameter,

    /// Operation type, e.g. `TriggerSmartContract`
    #[serde(rename = "type")]
    pub contract_type: String,

    /// Permission the signers act under; absent means owner
    #[serde(
        rename = "Permission_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub permission_id: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed operation payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractParameter {
    #[serde(default)]
    pub value: Value,

    #[serde(default)]
    pub type_url: String,
}

impl Transaction {
    /// First operation descriptor, if any
    pub fn first_contract(&self) -> Option<&ContractDescriptor> {
        self.raw_data.contract.first()
    }

    /// Owner address declared by the first operation, as canonical hex
    pub fn owner_address(&self) -> Option<String> {
        let owner = self
            .first_contract()?
            .parameter
            .value
            .get("owner_address")?
            .as_str()?;
        to_canonical_hex(owner).ok()
    }

    /// Permission id attached to the first operation
    pub fn permission_id(&self) -> Option<u32> {
        self.first_contract().and_then(|c| c.permission_id)
    }

    /// Attach a permission id to the first operation
    pub fn set_permission_id(&mut self, permission_id: u32) {
        if let Some(contract) = self.raw_data.contract.first_mut() {
            contract.permission_id = Some(permission_id);
        }
    }

    /// Append a signature unless an identical one is already present.
    ///
    /// Returns `true` if the signature was appended.
    pub fn add_signature(&mut self, signature: String) -> bool {
        if self.signature.iter().any(|s| s == &signature) {
            return false;
        }
        self.signature.push(signature);
        true
    }

    /// True once at least one signature is attached
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Decoded txID bytes
    pub fn tx_id_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(self.tx_id.trim_start_matches("0x"))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    pub fn trigger_transaction(owner_hex: &str) -> Transaction {
        serde_json::from_value(json!({
            "visible": false,
            "txID": "2a4f3b7a0e0b3b5e8a5c1d9a2f4e6b8c0d2e4f6a8b0c2d4e6f8a0b2c4d6e8f0a",
            "raw_data": {
                "contract": [{
                    "parameter": {
                        "value": {
                            "data": "a9059cbb",
                            "owner_address": owner_hex,
                            "contract_address": "41a614f803b6fd780986a42c78ec9c7f77e6ded13c"
                        },
                        "type_url": "type.googleapis.com/protocol.TriggerSmartContract"
                    },
                    "type": "TriggerSmartContract"
                }],
                "ref_block_bytes": "4a6e",
                "ref_block_hash": "1d5d2b1b8f5e7c3a",
                "expiration": 1_700_000_060_000i64,
                "fee_limit": 10_000_000,
                "timestamp": 1_700_000_000_000i64
            },
            "raw_data_hex": "0a024a6e"
        }))
        .expect("fixture transaction")
    }
}
