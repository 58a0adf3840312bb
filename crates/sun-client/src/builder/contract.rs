//! Smart contract deployment and invocation
//!
//! Call parameters are taken, in order of precedence, from a pre-encoded
//! hex blob, an ABI-v2 function descriptor with its values, a shielded
//! parameter blob, or a positional `{type, value}` list run through the
//! client's codec. Positional `address` values are rewritten to EVM hex and
//! `trcToken` is encoded as `uint256`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sun_core::{is_hex, strip_0x, Address, Result, SunError, Transaction, TriggerResult};

use super::{object, with_permission, TransactionBuilder, TxOptions};
use crate::abi::{AbiEntry, ContractAbi};
use crate::client::MAX_FEE_LIMIT;
use crate::response::unwrap_as;
use crate::transport::NodeKind;
use crate::validator::{ParameterValidator, Rule};

/// Upper bound for `origin_energy_limit`
pub const MAX_ORIGIN_ENERGY_LIMIT: i64 = 10_000_000;

/// One positional call parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallParameter {
    #[serde(rename = "type")]
    pub param_type: String,
    pub value: Value,
}

impl CallParameter {
    pub fn new(param_type: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            param_type: param_type.into(),
            value: value.into(),
        }
    }
}

/// Deployment options
#[derive(Clone, Debug, PartialEq)]
pub struct DeployOptions {
    pub abi: ContractAbi,
    /// Creation bytecode, hex with or without `0x`
    pub bytecode: String,
    pub name: String,
    /// Client default when unset
    pub fee_limit: Option<i64>,
    pub call_value: i64,
    /// Share of energy paid by callers, 0 to 100
    pub user_fee_percentage: i64,
    pub origin_energy_limit: i64,
    /// Constructor arguments, positional
    pub parameters: Vec<Value>,
    /// Pre-encoded constructor arguments; wins over `parameters`
    pub raw_parameter: Option<String>,
    pub token_value: Option<i64>,
    pub token_id: Option<i64>,
    pub permission_id: Option<u32>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            abi: ContractAbi::default(),
            bytecode: String::new(),
            name: String::new(),
            fee_limit: None,
            call_value: 0,
            user_fee_percentage: 100,
            origin_energy_limit: MAX_ORIGIN_ENERGY_LIMIT,
            parameters: Vec::new(),
            raw_parameter: None,
            token_value: None,
            token_id: None,
            permission_id: None,
        }
    }
}

/// Invocation options
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriggerOptions {
    /// Client default when unset; never sent for constant calls
    pub fee_limit: Option<i64>,
    pub call_value: i64,
    pub token_value: Option<i64>,
    pub token_id: Option<i64>,
    pub raw_parameter: Option<String>,
    pub func_abi_v2: Option<AbiEntry>,
    pub parameters_v2: Vec<Value>,
    pub shielded_parameter: Option<String>,
    pub permission_id: Option<u32>,
    /// Route to the solidity node
    pub confirmed: bool,
}

impl TriggerOptions {
    fn tx_options(&self) -> TxOptions {
        TxOptions {
            permission_id: self.permission_id,
        }
    }
}

impl TransactionBuilder {
    /// Deploy a contract owned by `issuer`
    pub async fn create_smart_contract(&self, options: &DeployOptions, issuer: Option<&str>) -> Result<Transaction> {
        let fee_limit = options.fee_limit.unwrap_or_else(|| self.client().fee_limit());

        let normalized = ParameterValidator::validate(vec![
            Rule::integer("feeLimit", fee_limit).gt(0).lte(MAX_FEE_LIMIT),
            Rule::integer("callValue", options.call_value).gte(0),
            Rule::integer("userFeePercentage", options.user_fee_percentage).gte(0).lte(100),
            Rule::integer("originEnergyLimit", options.origin_energy_limit)
                .gte(0)
                .lte(MAX_ORIGIN_ENERGY_LIMIT),
            Rule::address("issuer", self.actor(issuer)),
            Rule::integer("tokenValue", options.token_value).gte(0).optional(),
            Rule::integer("tokenId", options.token_id).gte(0).optional(),
            Rule::hex("options.bytecode", options.bytecode.as_str()),
        ])?;

        let constructor = options.abi.constructor();
        let payable = constructor.map_or(false, AbiEntry::is_payable);
        let token_value = options.token_value.unwrap_or(0);

        if payable && options.call_value == 0 && token_value == 0 {
            return Err(SunError::Validation(
                "When contract is payable, options.callValue or options.tokenValue must be a positive integer".into(),
            ));
        }
        if !payable && (options.call_value > 0 || token_value > 0) {
            return Err(SunError::Validation(
                "When contract is not payable, options.callValue and options.tokenValue must be 0".into(),
            ));
        }

        let parameter = match (&options.raw_parameter, constructor) {
            (Some(raw), _) => raw_hex("raw parameter", raw)?,
            (None, Some(ctor)) if !ctor.inputs.is_empty() || !options.parameters.is_empty() => {
                if ctor.inputs.len() != options.parameters.len() {
                    return Err(SunError::Validation(format!(
                        "constructor needs {} but {} provided",
                        ctor.inputs.len(),
                        options.parameters.len()
                    )));
                }
                let positional: Vec<CallParameter> = ctor
                    .inputs
                    .iter()
                    .zip(&options.parameters)
                    .map(|(input, value)| CallParameter::new(input.canonical_type(), value.clone()))
                    .collect();
                self.encode_positional(&positional)?
            }
            _ => String::new(),
        };

        let abi = serde_json::to_string(&options.abi)?;
        let mut payload = object(json!({
            "owner_address": normalized.require_address("issuer")?,
            "fee_limit": fee_limit,
            "call_value": options.call_value,
            "consume_user_resource_percent": options.user_fee_percentage,
            "origin_energy_limit": options.origin_energy_limit,
            "abi": abi,
            "bytecode": strip_0x(&options.bytecode),
            "parameter": parameter,
            "name": options.name,
        }));
        if let Some(value) = options.token_value {
            payload.insert("call_token_value".into(), Value::from(value));
        }
        if let Some(id) = options.token_id {
            payload.insert("token_id".into(), Value::from(id));
        }

        let tx_options = TxOptions {
            permission_id: options.permission_id,
        };
        self.submit("wallet/deploycontract", payload, &tx_options).await
    }

    /// Build a state-changing call; the transaction is in the result
    pub async fn trigger_smart_contract(
        &self,
        contract: &str,
        selector: &str,
        options: &TriggerOptions,
        parameters: &[CallParameter],
        issuer: Option<&str>,
    ) -> Result<TriggerResult> {
        self.trigger(contract, selector, options, parameters, issuer, false, options.confirmed)
            .await
    }

    /// Read-only call against live state
    pub async fn trigger_constant_contract(
        &self,
        contract: &str,
        selector: &str,
        options: &TriggerOptions,
        parameters: &[CallParameter],
        issuer: Option<&str>,
    ) -> Result<TriggerResult> {
        self.trigger(contract, selector, options, parameters, issuer, true, options.confirmed)
            .await
    }

    /// Read-only call against confirmed state
    pub async fn trigger_confirmed_constant_contract(
        &self,
        contract: &str,
        selector: &str,
        options: &TriggerOptions,
        parameters: &[CallParameter],
        issuer: Option<&str>,
    ) -> Result<TriggerResult> {
        self.trigger(contract, selector, options, parameters, issuer, true, true)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn trigger(
        &self,
        contract: &str,
        selector: &str,
        options: &TriggerOptions,
        parameters: &[CallParameter],
        issuer: Option<&str>,
        constant: bool,
        confirmed: bool,
    ) -> Result<TriggerResult> {
        let fee_limit = options.fee_limit.unwrap_or_else(|| self.client().fee_limit());

        let mut rules = Vec::with_capacity(6);
        if !constant {
            rules.push(Rule::integer("feeLimit", fee_limit).gt(0).lte(MAX_FEE_LIMIT));
        }
        rules.extend([
            Rule::integer("callValue", options.call_value).gte(0),
            Rule::address("contract", contract),
            Rule::address("issuer", self.actor(issuer)).optional(),
            Rule::integer("tokenValue", options.token_value).gte(0).optional(),
            Rule::integer("tokenId", options.token_id).gte(0).optional(),
        ]);
        let normalized = ParameterValidator::validate(rules)?;

        let selector: String = selector.chars().filter(|c| !c.is_whitespace()).collect();
        let parameter = self.call_parameter(options, parameters)?;

        let mut payload = Map::new();
        payload.insert("contract_address".into(), Value::from(normalized.require_address("contract")?));
        if let Some(owner) = normalized.address("issuer") {
            payload.insert("owner_address".into(), Value::from(owner));
        }
        payload.insert("function_selector".into(), Value::from(selector.as_str()));
        payload.insert("parameter".into(), Value::from(parameter));

        if !constant {
            payload.insert("call_value".into(), Value::from(options.call_value));
            payload.insert("fee_limit".into(), Value::from(fee_limit));
            if let Some(value) = options.token_value {
                payload.insert("call_token_value".into(), Value::from(value));
            }
            if let Some(id) = options.token_id {
                payload.insert("token_id".into(), Value::from(id));
            }
        }
        let payload = with_permission(payload, &options.tx_options());

        let (node, path) = trigger_route(constant, confirmed);
        let response = self.client().post(node, path, Value::Object(payload)).await?;
        let result: TriggerResult = unwrap_as(response)?;
        tracing::debug!(path, selector = %selector, ok = result.result.result, "contract triggered");
        Ok(result)
    }

    fn call_parameter(&self, options: &TriggerOptions, parameters: &[CallParameter]) -> Result<String> {
        if let Some(raw) = &options.raw_parameter {
            return raw_hex("raw parameter", raw);
        }
        if let Some(function) = &options.func_abi_v2 {
            let encoded = self.client().codec().encode_v2(function, &options.parameters_v2)?;
            return Ok(hex::encode(encoded));
        }
        if let Some(shielded) = &options.shielded_parameter {
            return raw_hex("shielded parameter", shielded);
        }
        self.encode_positional(parameters)
    }

    /// Hex of the positional parameter block, without `0x`
    fn encode_positional(&self, parameters: &[CallParameter]) -> Result<String> {
        if parameters.is_empty() {
            return Ok(String::new());
        }

        let mut types = Vec::with_capacity(parameters.len());
        let mut values = Vec::with_capacity(parameters.len());
        for param in parameters {
            let declared = param.param_type.trim();
            if declared.is_empty() {
                return Err(SunError::Encoding(format!(
                    "Invalid parameter type provided: {}",
                    param.param_type
                )));
            }
            let value = if declared == "address" || declared.starts_with("address[") {
                to_evm_addresses(&param.value)?
            } else {
                param.value.clone()
            };
            types.push(declared.replace("trcToken", "uint256"));
            values.push(value);
        }

        let encoded = self.client().codec().encode(&types, &values)?;
        Ok(hex::encode(encoded))
    }

    /// Change the share of energy paid by callers
    pub async fn update_setting(
        &self,
        contract: &str,
        user_fee_percentage: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("owner", self.actor(owner)),
            Rule::address("contract", contract),
            Rule::integer("userFeePercentage", user_fee_percentage).gte(0).lte(100),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("owner")?,
            "contract_address": normalized.require_address("contract")?,
            "consume_user_resource_percent": user_fee_percentage,
        }));
        self.submit("wallet/updatesetting", payload, options).await
    }

    pub async fn update_energy_limit(
        &self,
        contract: &str,
        origin_energy_limit: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("owner", self.actor(owner)),
            Rule::address("contract", contract),
            Rule::integer("originEnergyLimit", origin_energy_limit)
                .gte(0)
                .lte(MAX_ORIGIN_ENERGY_LIMIT),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("owner")?,
            "contract_address": normalized.require_address("contract")?,
            "origin_energy_limit": origin_energy_limit,
        }));
        self.submit("wallet/updateenergylimit", payload, options).await
    }

    /// Remove the on-chain ABI of `contract` and drop the cached copy
    pub async fn clear_abi(&self, contract: &str, owner: Option<&str>, options: &TxOptions) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("contract", contract),
            Rule::address("owner", self.actor(owner)),
        ])?;

        let payload = object(json!({
            "contract_address": normalized.require_address("contract")?,
            "owner_address": normalized.require_address("owner")?,
        }));
        let transaction = self.submit("wallet/clearabi", payload, options).await?;
        self.client().invalidate_abi(contract);
        Ok(transaction)
    }
}

/// Node and path for a trigger call
pub(crate) fn trigger_route(constant: bool, confirmed: bool) -> (NodeKind, &'static str) {
    match (constant, confirmed) {
        (true, true) => (NodeKind::Solidity, "walletsolidity/triggerconstantcontract"),
        (true, false) => (NodeKind::Full, "wallet/triggerconstantcontract"),
        (false, true) => (NodeKind::Solidity, "walletsolidity/triggersmartcontract"),
        (false, false) => (NodeKind::Full, "wallet/triggersmartcontract"),
    }
}

fn raw_hex(name: &str, value: &str) -> Result<String> {
    if !is_hex(value) {
        return Err(SunError::Validation(format!("Invalid {} provided", name)));
    }
    Ok(strip_0x(value).to_string())
}

fn to_evm_addresses(value: &Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(Address::parse(s)?.to_evm_hex())),
        Value::Array(items) => items
            .iter()
            .map(to_evm_addresses)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}
