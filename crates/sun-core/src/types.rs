//! Node-facing types shared by the client and the bridge
//!
//! These mirror the JSON the ledger nodes speak. Fields the nodes may omit
//! are defaulted so that partial responses still deserialize.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Result, SunError};
use crate::transaction::Transaction;

/// Bandwidth or energy, the two stakeable resources
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    #[default]
    Bandwidth,
    Energy,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bandwidth => "BANDWIDTH",
            Self::Energy => "ENERGY",
        }
    }

    /// Parse the wire name; anything but the two known names is rejected
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BANDWIDTH" => Some(Self::Bandwidth),
            "ENERGY" => Some(Self::Energy),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a permission set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermissionType {
    Owner,
    Witness,
    Active,
}

impl PermissionType {
    /// Numeric tag used on the wire
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Owner => 0,
            Self::Witness => 1,
            Self::Active => 2,
        }
    }

    pub fn from_i64(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(Self::Owner),
            1 => Some(Self::Witness),
            2 => Some(Self::Active),
            _ => None,
        }
    }

    /// Lowercase name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Witness => "witness",
            Self::Active => "active",
        }
    }
}

/// One weighted signer in a permission set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionKey {
    /// Address in any accepted form; canonicalized before sending
    pub address: String,
    pub weight: Value,
}

/// Weighted multisignature policy
///
/// `threshold` and `weight` stay untyped so that caller mistakes (a string
/// threshold, a fractional weight) surface as validation errors rather than
/// deserialization failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PermissionSet {
    #[serde(rename = "type", default)]
    pub permission_type: Value,

    #[serde(default)]
    pub permission_name: Value,

    #[serde(default)]
    pub threshold: Value,

    #[serde(default)]
    pub keys: Vec<PermissionKey>,

    /// 32-byte operation bitmap, hex; required for active permissions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PermissionSet {
    /// Typed constructor for callers that build sets in code
    pub fn new(
        permission_type: PermissionType,
        name: impl Into<String>,
        threshold: i64,
        keys: Vec<(String, i64)>,
    ) -> Self {
        Self {
            permission_type: Value::from(permission_type.as_i64()),
            permission_name: Value::String(name.into()),
            threshold: Value::from(threshold),
            keys: keys
                .into_iter()
                .map(|(address, weight)| PermissionKey {
                    address,
                    weight: Value::from(weight),
                })
                .collect(),
            operations: None,
            extra: Map::new(),
        }
    }

    pub fn with_operations(mut self, operations: impl Into<String>) -> Self {
        self.operations = Some(operations.into());
        self
    }
}

/// Status block of a sign-weight report
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignWeightStatus {
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Keys of the permission a sign-weight report was computed against
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignWeightPermission {
    #[serde(default)]
    pub keys: Vec<PermissionKey>,

    #[serde(default)]
    pub threshold: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wrapper around the re-issued transaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignWeightTransaction {
    pub transaction: Transaction,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Remote report from `wallet/getsignweight`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignWeightResult {
    #[serde(default)]
    pub result: SignWeightStatus,

    /// Addresses that already signed, canonical hex
    #[serde(default)]
    pub approved_list: Vec<String>,

    #[serde(default)]
    pub permission: Option<SignWeightPermission>,

    #[serde(default)]
    pub current_weight: Option<i64>,

    #[serde(default)]
    pub transaction: Option<SignWeightTransaction>,
}

impl SignWeightResult {
    pub const PERMISSION_ERROR: &'static str = "PERMISSION_ERROR";

    pub fn is_permission_error(&self) -> bool {
        self.result.code.as_deref() == Some(Self::PERMISSION_ERROR)
    }

    /// Re-issued canonical transaction, if the node returned one
    pub fn canonical_transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref().map(|t| &t.transaction)
    }
}

/// Status block of a trigger response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerStatus {
    #[serde(default)]
    pub result: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of the trigger endpoints
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerResult {
    #[serde(default)]
    pub result: TriggerStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,

    /// Hex return data of a constant call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constant_result: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_used: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TriggerResult {
    /// The assembled transaction, or an error carrying the whole response
    pub fn into_transaction(self) -> Result<Transaction> {
        if !self.result.result {
            let raw = serde_json::to_string(&self)?;
            return Err(SunError::Remote(format!("Unknown error: {}", raw)));
        }
        match self.transaction {
            Some(tx) => Ok(tx),
            None => Err(SunError::Remote(
                "Trigger succeeded but returned no transaction".into(),
            )),
        }
    }
}

/// Response of `wallet/broadcasttransaction`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastResult {
    #[serde(default)]
    pub result: bool,

    #[serde(default)]
    pub txid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Hex encoded utf8 as returned by the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Execution receipt from `gettransactioninfobyid`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub fee: Option<i64>,

    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<i64>,

    #[serde(rename = "blockTimeStamp", default)]
    pub block_timestamp: Option<i64>,

    /// Hex return data, one entry per executed call
    #[serde(rename = "contractResult", default)]
    pub contract_result: Option<Vec<String>>,

    #[serde(default)]
    pub contract_address: Option<String>,

    #[serde(default)]
    pub receipt: Value,

    /// `"FAILED"` on revert; absent on success
    #[serde(default)]
    pub result: Option<String>,

    /// Hex encoded revert reason
    #[serde(rename = "resMessage", default)]
    pub res_message: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionInfo {
    pub fn is_failed(&self) -> bool {
        self.result.as_deref() == Some("FAILED")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_type_wire_names() {
        assert_eq!(
            serde_json::to_value(ResourceType::Energy).unwrap(),
            json!("ENERGY")
        );
        assert_eq!(ResourceType::parse("BANDWIDTH"), Some(ResourceType::Bandwidth));
        assert_eq!(ResourceType::parse("bandwidth"), None);
    }

    #[test]
    fn test_permission_type_tags() {
        for ty in [PermissionType::Owner, PermissionType::Witness, PermissionType::Active] {
            assert_eq!(PermissionType::from_i64(ty.as_i64()), Some(ty));
        }
        assert_eq!(PermissionType::from_i64(3), None);
    }

    #[test]
    fn test_sign_weight_permission_error() {
        let report: SignWeightResult = serde_json::from_value(json!({
            "result": {"code": "PERMISSION_ERROR", "message": "permission isn't exit"},
            "permission": {"keys": []}
        }))
        .unwrap();
        assert!(report.is_permission_error());
        assert!(report.canonical_transaction().is_none());
    }

    #[test]
    fn test_trigger_failure_embeds_payload() {
        let result: TriggerResult = serde_json::from_value(json!({
            "result": {"code": "CONTRACT_VALIDATE_ERROR", "message": "6e6f"}
        }))
        .unwrap();
        let err = result.into_transaction().unwrap_err();
        assert!(err.to_string().starts_with("Unknown error: "));
        assert!(err.to_string().contains("CONTRACT_VALIDATE_ERROR"));
    }

    #[test]
    fn test_transaction_info_failed() {
        let info: TransactionInfo = serde_json::from_value(json!({
            "id": "ab",
            "result": "FAILED",
            "resMessage": "7265766572746564",
            "receipt": {"result": "REVERT"}
        }))
        .unwrap();
        assert!(info.is_failed());
        assert_eq!(info.contract_result, None);
    }
}
