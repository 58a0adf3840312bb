//! Main chain / side chain bridge
//!
//! Deposits call the main-chain gateway and are signed over the plain txID.
//! Withdrawals call the side-chain gateway (or the side-chain token) and are
//! signed over `SHA-256(txID ‖ chainId)`. Every contract call goes through
//! the same flow: trigger, sign, broadcast, and optionally poll the receipt.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use sun_client::validator::{ParameterValidator, Rule};
use sun_client::{CallParameter, LedgerClient, TriggerOptions, MAX_FEE_LIMIT};
use sun_core::{Result, SignWeightResult, SunError, Transaction};
use sun_crypto::PrivateKey;
use tokio_util::sync::CancellationToken;

use crate::config::{parse_chain_id, parse_gateway, BridgeGatewayConfig, Gateways};
use crate::poller::{ReceiptOutput, ReceiptPoller, Sleeper, TokioSleeper};
use crate::signer::{self, resolve_key, SignOptions, SigningDomain};

/// Which chain an operation targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Chain {
    Main,
    Side,
}

/// Per-call overrides for bridge operations.
///
/// Set fields replace the values the operation computes from its
/// arguments. The call value is always computed.
#[derive(Clone, Debug, Default)]
pub struct BridgeCallOptions {
    pub fee_limit: Option<i64>,
    pub token_id: Option<i64>,
    pub token_value: Option<i64>,
    /// Co-sign under this permission through the multisig flow
    pub permission_id: Option<u32>,
    /// Wait for the execution receipt instead of returning the txid
    pub should_poll_response: bool,
    /// Return the receipt as-is instead of the decoded result
    pub raw_response: bool,
    /// Abort a pending receipt poll
    pub cancellation: Option<CancellationToken>,
}

/// Result of a submitted bridge call
#[derive(Clone, Debug, PartialEq)]
pub enum SendOutcome {
    /// Broadcast accepted; carries the txid
    Submitted(String),
    /// Receipt obtained; raw receipt or decoded result
    Confirmed(Value),
}

impl SendOutcome {
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            Self::Submitted(tx_id) => Some(tx_id),
            Self::Confirmed(_) => None,
        }
    }
}

/// A gateway or token contract call, before per-call overrides
#[derive(Debug)]
struct ContractCall {
    chain: Chain,
    contract: String,
    selector: &'static str,
    parameters: Vec<CallParameter>,
    outputs: Vec<String>,
    call_value: i64,
    fee_limit: i64,
    token_id: Option<i64>,
    token_value: Option<i64>,
}

impl ContractCall {
    fn new(chain: Chain, contract: String, selector: &'static str, call_value: i64, fee_limit: i64) -> Self {
        Self {
            chain,
            contract,
            selector,
            parameters: Vec::new(),
            outputs: vec!["uint256".into()],
            call_value,
            fee_limit,
            token_id: None,
            token_value: None,
        }
    }

    fn param(mut self, param_type: &str, value: impl Into<Value>) -> Self {
        self.parameters.push(CallParameter::new(param_type, value));
        self
    }

    fn outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    fn token(mut self, token_id: i64, token_value: i64) -> Self {
        self.token_id = Some(token_id);
        self.token_value = Some(token_value);
        self
    }
}

/// Bridge between two ledger client contexts sharing one identity
pub struct SidechainBridge {
    main: LedgerClient,
    side: LedgerClient,
    gateways: RwLock<Gateways>,
    sleeper: Arc<dyn Sleeper>,
}

impl SidechainBridge {
    /// Bind two clients to a gateway configuration; fails if any field is invalid
    pub fn new(main: LedgerClient, side: LedgerClient, config: &BridgeGatewayConfig) -> Result<Self> {
        let gateways = config.validate()?;
        Ok(Self {
            main,
            side,
            gateways: RwLock::new(gateways),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn main_chain(&self) -> &LedgerClient {
        &self.main
    }

    pub fn side_chain(&self) -> &LedgerClient {
        &self.side
    }

    pub fn client(&self, chain: Chain) -> &LedgerClient {
        match chain {
            Chain::Main => &self.main,
            Chain::Side => &self.side,
        }
    }

    pub fn gateways(&self) -> Gateways {
        self.gateways.read().clone()
    }

    /// Use `key` on both chains
    pub fn set_private_key(&self, key: PrivateKey) {
        self.main.set_private_key(key.clone());
        self.side.set_private_key(key);
    }

    pub fn set_main_gateway(&self, address: &str) -> Result<()> {
        let main = parse_gateway("main", address)?;
        self.gateways.write().main = main;
        Ok(())
    }

    pub fn set_side_gateway(&self, address: &str) -> Result<()> {
        let side = parse_gateway("side", address)?;
        self.gateways.write().side = side;
        Ok(())
    }

    pub fn set_side_chain_id(&self, chain_id: &str) -> Result<()> {
        let chain_id = parse_chain_id(chain_id)?;
        self.gateways.write().chain_id = chain_id;
        Ok(())
    }

    /// Signing domain for transactions on `chain`
    pub fn domain(&self, chain: Chain) -> SigningDomain {
        match chain {
            Chain::Main => SigningDomain::MainChain,
            Chain::Side => SigningDomain::SideChain {
                chain_id: self.gateways.read().chain_id.clone(),
            },
        }
    }

    // === Signing ===

    /// Append this identity's side-chain signature; idempotent
    pub fn sign_transaction(&self, transaction: &mut Transaction, private_key: Option<&str>) -> Result<bool> {
        let key = resolve_key(&self.side, private_key)?;
        signer::sign_transaction(transaction, &key, &self.domain(Chain::Side))
    }

    /// Sign for `chain`, through the multisig flow when a permission is given
    pub async fn sign(
        &self,
        chain: Chain,
        transaction: Transaction,
        private_key: Option<&str>,
        options: &SignOptions,
    ) -> Result<Transaction> {
        let client = self.client(chain);
        let key = resolve_key(client, private_key)?;
        signer::sign(client, transaction, &key, &self.domain(chain), options).await
    }

    pub async fn multi_sign(
        &self,
        chain: Chain,
        transaction: &Transaction,
        private_key: Option<&str>,
        permission_id: u32,
    ) -> Result<Transaction> {
        let client = self.client(chain);
        let key = resolve_key(client, private_key)?;
        signer::multi_sign(client, transaction, &key, permission_id, &self.domain(chain)).await
    }

    pub async fn get_sign_weight(
        &self,
        chain: Chain,
        transaction: &Transaction,
        permission_id: Option<u32>,
    ) -> Result<SignWeightResult> {
        self.client(chain).get_sign_weight(transaction, permission_id).await
    }

    // === Deposits (main chain) ===

    /// Lock `call_value` TRX in the main gateway
    pub async fn deposit_trx(
        &self,
        call_value: i64,
        deposit_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        ParameterValidator::validate(vec![
            Rule::integer("callValue", call_value).gte(0),
            Rule::integer("depositFee", deposit_fee).gte(0),
            fee_limit_rule(fee_limit),
        ])?;

        let call = ContractCall::new(
            Chain::Main,
            self.gateways().main.to_hex(),
            "depositTRX()",
            total_call_value(call_value, deposit_fee)?,
            fee_limit,
        );
        self.send(call, options, private_key).await
    }

    pub async fn deposit_trc10(
        &self,
        token_id: i64,
        token_value: i64,
        deposit_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        ParameterValidator::validate(vec![
            Rule::integer("tokenValue", token_value).gte(0),
            Rule::integer("depositFee", deposit_fee).gte(0),
            fee_limit_rule(fee_limit),
            Rule::integer("tokenId", token_id).gte(0),
        ])?;

        let call = ContractCall::new(
            Chain::Main,
            self.gateways().main.to_hex(),
            "depositTRC10(uint64,uint64)",
            deposit_fee,
            fee_limit,
        )
        .param("uint64", token_id)
        .param("uint64", token_value)
        .token(token_id, token_value);
        self.send(call, options, private_key).await
    }

    /// Approve the main gateway for `num`, then deposit it
    pub async fn deposit_trc20(
        &self,
        num: i64,
        deposit_fee: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.deposit_token("depositTRC20(address,uint64)", "uint64", "num", num, deposit_fee, fee_limit, contract_address, options, private_key)
            .await
    }

    /// Approve the main gateway for token `id`, then deposit it
    pub async fn deposit_trc721(
        &self,
        id: i64,
        deposit_fee: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.deposit_token("depositTRC721(address,uint256)", "uint256", "id", id, deposit_fee, fee_limit, contract_address, options, private_key)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn deposit_token(
        &self,
        selector: &'static str,
        amount_type: &str,
        amount_name: &str,
        amount: i64,
        deposit_fee: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        let normalized = ParameterValidator::validate(vec![
            amount_rule(amount_name, amount),
            Rule::integer("depositFee", deposit_fee).gte(0),
            fee_limit_rule(fee_limit),
            Rule::address("contractAddress", contract_address),
        ])?;
        let contract = normalized.require_address("contractAddress")?;

        let approve = BridgeCallOptions {
            fee_limit: options.fee_limit,
            permission_id: options.permission_id,
            ..Default::default()
        };
        let approval = self.approve(&contract, amount, fee_limit, &approve, private_key).await?;
        tracing::debug!(?approval, selector, "gateway approved");

        let call = ContractCall::new(Chain::Main, self.gateways().main.to_hex(), selector, deposit_fee, fee_limit)
            .param("address", contract)
            .param(amount_type, amount);
        self.send(call, options, private_key).await
    }

    /// Let the main gateway move `num` of a TRC20 token
    pub async fn approve_trc20(
        &self,
        num: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        let normalized = ParameterValidator::validate(vec![
            amount_rule("num", num),
            fee_limit_rule(fee_limit),
            Rule::address("contractAddress", contract_address),
        ])?;
        let contract = normalized.require_address("contractAddress")?;
        self.approve(&contract, num, fee_limit, options, private_key).await
    }

    /// Let the main gateway move TRC721 token `id`
    pub async fn approve_trc721(
        &self,
        id: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        let normalized = ParameterValidator::validate(vec![
            amount_rule("id", id),
            fee_limit_rule(fee_limit),
            Rule::address("contractAddress", contract_address),
        ])?;
        let contract = normalized.require_address("contractAddress")?;
        self.approve(&contract, id, fee_limit, options, private_key).await
    }

    async fn approve(
        &self,
        contract: &str,
        amount: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        let call = ContractCall::new(Chain::Main, contract.to_string(), "approve(address,uint256)", 0, fee_limit)
            .param("address", self.gateways().main.to_hex())
            .param("uint256", amount)
            .outputs(&["bool"]);
        self.send(call, options, private_key).await
    }

    /// Map a main-chain TRC20 deployment to the side chain
    pub async fn mapping_trc20(
        &self,
        trx_hash: &str,
        mapping_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.mapping("mappingTRC20(bytes)", trx_hash, mapping_fee, fee_limit, options, private_key)
            .await
    }

    /// Map a main-chain TRC721 deployment to the side chain
    pub async fn mapping_trc721(
        &self,
        trx_hash: &str,
        mapping_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.mapping("mappingTRC721(bytes)", trx_hash, mapping_fee, fee_limit, options, private_key)
            .await
    }

    async fn mapping(
        &self,
        selector: &'static str,
        trx_hash: &str,
        mapping_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        ParameterValidator::validate(vec![
            Rule::hex("trxHash", trx_hash),
            Rule::integer("mappingFee", mapping_fee).gte(0),
            fee_limit_rule(fee_limit),
        ])?;

        let hash = format!("0x{}", sun_core::strip_0x(trx_hash));
        let call = ContractCall::new(Chain::Main, self.gateways().main.to_hex(), selector, mapping_fee, fee_limit)
            .param("bytes", hash);
        self.send(call, options, private_key).await
    }

    /// Replay a stuck deposit identified by its gateway nonce
    pub async fn retry_deposit(
        &self,
        nonce: i64,
        retry_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.retry(Chain::Main, "retryDeposit(uint256)", nonce, retry_fee, fee_limit, options, private_key)
            .await
    }

    pub async fn retry_mapping(
        &self,
        nonce: i64,
        retry_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.retry(Chain::Main, "retryMapping(uint256)", nonce, retry_fee, fee_limit, options, private_key)
            .await
    }

    // === Withdrawals (side chain) ===

    pub async fn withdraw_trx(
        &self,
        call_value: i64,
        withdraw_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        ParameterValidator::validate(vec![
            Rule::integer("callValue", call_value).gte(0),
            Rule::integer("withdrawFee", withdraw_fee).gte(0),
            fee_limit_rule(fee_limit),
        ])?;

        let call = ContractCall::new(
            Chain::Side,
            self.gateways().side.to_hex(),
            "withdrawTRX()",
            total_call_value(call_value, withdraw_fee)?,
            fee_limit,
        );
        self.send(call, options, private_key).await
    }

    pub async fn withdraw_trc10(
        &self,
        token_id: i64,
        token_value: i64,
        withdraw_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        ParameterValidator::validate(vec![
            Rule::integer("tokenValue", token_value).gte(0),
            Rule::integer("withdrawFee", withdraw_fee).gte(0),
            fee_limit_rule(fee_limit),
            Rule::integer("tokenId", token_id).gte(0),
        ])?;

        let call = ContractCall::new(
            Chain::Side,
            self.gateways().side.to_hex(),
            "withdrawTRC10(uint256,uint256)",
            withdraw_fee,
            fee_limit,
        )
        .param("uint256", token_id)
        .param("uint256", token_value)
        .token(token_id, token_value);
        self.send(call, options, private_key).await
    }

    /// Burn `num` of a side-chain TRC20 token to release it on the main chain
    pub async fn withdraw_trc20(
        &self,
        num: i64,
        withdraw_fee: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.withdraw_token("num", num, withdraw_fee, fee_limit, contract_address, options, private_key)
            .await
    }

    pub async fn withdraw_trc721(
        &self,
        id: i64,
        withdraw_fee: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.withdraw_token("id", id, withdraw_fee, fee_limit, contract_address, options, private_key)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn withdraw_token(
        &self,
        amount_name: &str,
        amount: i64,
        withdraw_fee: i64,
        fee_limit: i64,
        contract_address: &str,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        let normalized = ParameterValidator::validate(vec![
            amount_rule(amount_name, amount),
            Rule::integer("withdrawFee", withdraw_fee).gte(0),
            fee_limit_rule(fee_limit),
            Rule::address("contractAddress", contract_address),
        ])?;

        let call = ContractCall::new(
            Chain::Side,
            normalized.require_address("contractAddress")?,
            "withdrawal(uint256)",
            withdraw_fee,
            fee_limit,
        )
        .param("uint256", amount);
        self.send(call, options, private_key).await
    }

    pub async fn retry_withdraw(
        &self,
        nonce: i64,
        retry_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        self.retry(Chain::Side, "retryWithdraw(uint256)", nonce, retry_fee, fee_limit, options, private_key)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn retry(
        &self,
        chain: Chain,
        selector: &'static str,
        nonce: i64,
        retry_fee: i64,
        fee_limit: i64,
        options: &BridgeCallOptions,
        private_key: Option<&str>,
    ) -> Result<SendOutcome> {
        ParameterValidator::validate(vec![
            Rule::integer("nonce", nonce).gte(0),
            Rule::integer("retryFee", retry_fee).gte(0),
            fee_limit_rule(fee_limit),
        ])?;

        let gateways = self.gateways();
        let gateway = match chain {
            Chain::Main => gateways.main,
            Chain::Side => gateways.side,
        };
        let call = ContractCall::new(chain, gateway.to_hex(), selector, retry_fee, fee_limit).param("uint256", nonce);
        self.send(call, options, private_key).await
    }

    // === Side chain funding ===

    /// Inject `amount` into the side chain fund; returns the txid
    pub async fn inject_fund(&self, amount: i64, fee_limit: i64, private_key: Option<&str>) -> Result<String> {
        ParameterValidator::validate(vec![
            Rule::integer("amount", amount).gt(0),
            fee_limit_rule(fee_limit),
        ])?;

        let key = resolve_key(&self.side, private_key)?;
        let payload = json!({
            "owner_address": key.address().to_hex(),
            "amount": amount,
        });
        let transaction = self.side.request_transaction("wallet/fundinject", payload).await?;

        let signed = signer::sign(
            &self.side,
            transaction,
            &key,
            &self.domain(Chain::Side),
            &SignOptions::default(),
        )
        .await?;
        let result = self.side.broadcast(&signed).await?;
        Ok(result.txid)
    }

    // === Send flow ===

    async fn send(&self, call: ContractCall, options: &BridgeCallOptions, private_key: Option<&str>) -> Result<SendOutcome> {
        let client = self.client(call.chain);
        let key = resolve_key(client, private_key)?;
        let issuer = key.address().to_hex();

        // the permission goes through the multisig flow at signing time
        let trigger = TriggerOptions {
            fee_limit: Some(options.fee_limit.unwrap_or(call.fee_limit)),
            call_value: call.call_value,
            token_id: options.token_id.or(call.token_id),
            token_value: options.token_value.or(call.token_value),
            ..Default::default()
        };
        let transaction = client
            .transaction_builder()
            .trigger_smart_contract(&call.contract, call.selector, &trigger, &call.parameters, Some(&issuer))
            .await?
            .into_transaction()?;

        let sign_options = SignOptions {
            permission_id: options.permission_id,
            skip_owner_check: false,
        };
        let signed = signer::sign(client, transaction, &key, &self.domain(call.chain), &sign_options).await?;
        if signed.signature.is_empty() {
            return Err(SunError::Signing("Transaction was not signed properly".into()));
        }

        let broadcast = client.broadcast(&signed).await?;
        tracing::info!(chain = ?call.chain, selector = call.selector, tx_id = %broadcast.txid, "bridge call submitted");

        if !options.should_poll_response {
            return Ok(SendOutcome::Submitted(broadcast.txid));
        }

        let output = if options.raw_response {
            ReceiptOutput::Raw
        } else {
            ReceiptOutput::Decoded(call.outputs)
        };
        let mut poller = ReceiptPoller::new(client.clone()).with_sleeper(self.sleeper.clone());
        if let Some(cancel) = &options.cancellation {
            poller = poller.with_cancellation(cancel.clone());
        }
        poller.wait(&broadcast.txid, &output).await.map(SendOutcome::Confirmed)
    }
}

impl std::fmt::Debug for SidechainBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gateways = self.gateways.read();
        f.debug_struct("SidechainBridge")
            .field("main_gateway", &gateways.main)
            .field("side_gateway", &gateways.side)
            .field("side_chain_id", &hex::encode(&gateways.chain_id))
            .finish()
    }
}

/// Fungible amounts (`num`) must be positive; token ids (`id`) may be zero
fn amount_rule(name: &str, amount: i64) -> Rule {
    let rule = Rule::integer(name, amount);
    if name == "num" {
        rule.gt(0)
    } else {
        rule.gte(0)
    }
}

/// Value plus fee, rejected if it does not fit
fn total_call_value(value: i64, fee: i64) -> Result<i64> {
    value
        .checked_add(fee)
        .ok_or_else(|| SunError::Validation("Invalid callValue provided".into()))
}

fn fee_limit_rule(fee_limit: i64) -> Rule {
    Rule::integer("feeLimit", fee_limit).gt(0).lte(MAX_FEE_LIMIT)
}
