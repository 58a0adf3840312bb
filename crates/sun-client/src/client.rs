//! Ledger client context
//!
//! A `LedgerClient` binds a node transport, an ABI codec and one default
//! signing identity. It is cheap to clone; clones share the identity and
//! the ABI cache. Use one client per identity.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Value};
use sun_core::{
    decode_node_message, Address, BroadcastResult, Result, SignWeightResult, SunError, Transaction,
};
use sun_crypto::PrivateKey;

use crate::abi::{AbiCodec, ContractAbi, StandardAbiCodec};
use crate::builder::TransactionBuilder;
use crate::response::{reject_error_field, unwrap_as, unwrap_response};
use crate::transport::{NodeKind, NodeTransport};

/// Fee limit applied to state-changing contract calls when the caller sets none
pub const DEFAULT_FEE_LIMIT: i64 = 150_000_000;

/// Upper bound the ledger accepts for `fee_limit`
pub const MAX_FEE_LIMIT: i64 = 1_000_000_000;

#[derive(Clone, Debug, Default)]
struct Identity {
    address: Option<Address>,
    private_key: Option<PrivateKey>,
}

struct ClientInner {
    transport: Arc<dyn NodeTransport>,
    codec: Arc<dyn AbiCodec>,
    identity: RwLock<Identity>,
    fee_limit: i64,
    /// Canonical contract hex -> ABI
    abi_cache: RwLock<HashMap<String, ContractAbi>>,
}

/// Shared client context
#[derive(Clone)]
pub struct LedgerClient {
    inner: Arc<ClientInner>,
}

/// Builder for [`LedgerClient`]
pub struct ClientBuilder {
    transport: Arc<dyn NodeTransport>,
    codec: Arc<dyn AbiCodec>,
    identity: Identity,
    fee_limit: i64,
}

impl ClientBuilder {
    pub fn codec(mut self, codec: Arc<dyn AbiCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Default signing identity; also sets the default address
    pub fn private_key(mut self, key: PrivateKey) -> Self {
        self.identity.address = Some(key.address());
        self.identity.private_key = Some(key);
        self
    }

    /// Default actor address for read-only or externally signed use
    pub fn default_address(mut self, address: Address) -> Self {
        self.identity.address = Some(address);
        self
    }

    pub fn fee_limit(mut self, fee_limit: i64) -> Self {
        self.fee_limit = fee_limit;
        self
    }

    pub fn build(self) -> LedgerClient {
        LedgerClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                codec: self.codec,
                identity: RwLock::new(self.identity),
                fee_limit: self.fee_limit,
                abi_cache: RwLock::new(HashMap::new()),
            }),
        }
    }
}

impl LedgerClient {
    pub fn builder(transport: Arc<dyn NodeTransport>) -> ClientBuilder {
        ClientBuilder {
            transport,
            codec: Arc::new(StandardAbiCodec),
            identity: Identity::default(),
            fee_limit: DEFAULT_FEE_LIMIT,
        }
    }

    pub fn new(transport: Arc<dyn NodeTransport>) -> Self {
        Self::builder(transport).build()
    }

    /// Operation builder bound to this client
    pub fn transaction_builder(&self) -> TransactionBuilder {
        TransactionBuilder::new(self.clone())
    }

    pub fn codec(&self) -> &dyn AbiCodec {
        self.inner.codec.as_ref()
    }

    pub fn fee_limit(&self) -> i64 {
        self.inner.fee_limit
    }

    // === Identity ===

    pub fn default_address(&self) -> Option<Address> {
        self.inner.identity.read().address
    }

    pub fn default_private_key(&self) -> Option<PrivateKey> {
        self.inner.identity.read().private_key.clone()
    }

    /// Replace the signing identity and the default address with it
    pub fn set_private_key(&self, key: PrivateKey) {
        let mut identity = self.inner.identity.write();
        identity.address = Some(key.address());
        identity.private_key = Some(key);
    }

    /// Change the default address; a private key for another address is dropped
    pub fn set_default_address(&self, address: &str) -> Result<()> {
        let address = Address::parse(address)?;
        let mut identity = self.inner.identity.write();
        if identity
            .private_key
            .as_ref()
            .map_or(false, |key| key.address() != address)
        {
            identity.private_key = None;
        }
        identity.address = Some(address);
        Ok(())
    }

    // === Requests ===

    /// Raw POST, no unwrapping
    pub async fn post(&self, node: NodeKind, path: &str, payload: Value) -> Result<Value> {
        tracing::debug!(%node, path, "request");
        self.inner.transport.post(node, path, payload).await
    }

    /// POST to the full node and surface embedded errors
    pub async fn request(&self, path: &str, payload: Value) -> Result<Value> {
        let response = self.post(NodeKind::Full, path, payload).await?;
        unwrap_response(response)
    }

    /// POST to the full node and read the assembled transaction
    pub async fn request_transaction(&self, path: &str, payload: Value) -> Result<Transaction> {
        let response = self.post(NodeKind::Full, path, payload).await?;
        unwrap_as(response)
    }

    // === ABI cache ===

    /// ABI of a deployed contract, fetched once and cached
    pub async fn contract_abi(&self, contract: &str) -> Result<ContractAbi> {
        let key = Address::parse(contract)?.to_hex();
        if let Some(abi) = self.cached_abi(&key) {
            return Ok(abi);
        }

        let response = self
            .request("wallet/getcontract", json!({ "value": key }))
            .await?;
        if response.as_object().map_or(true, |o| o.is_empty()) {
            return Err(SunError::Remote("Contract does not exist".into()));
        }
        let abi: ContractAbi = serde_json::from_value(response.get("abi").cloned().unwrap_or(Value::Null))
            .unwrap_or_default();

        self.inner.abi_cache.write().insert(key, abi.clone());
        Ok(abi)
    }

    pub fn cached_abi(&self, contract: &str) -> Option<ContractAbi> {
        let key = Address::parse(contract).ok()?.to_hex();
        self.inner.abi_cache.read().get(&key).cloned()
    }

    pub fn cache_abi(&self, contract: &str, abi: ContractAbi) -> Result<()> {
        let key = Address::parse(contract)?.to_hex();
        self.inner.abi_cache.write().insert(key, abi);
        Ok(())
    }

    pub fn invalidate_abi(&self, contract: &str) {
        if let Ok(address) = Address::parse(contract) {
            self.inner.abi_cache.write().remove(&address.to_hex());
        }
    }

    // === Multisig, broadcast, receipts ===

    /// Remote sign-weight report for `transaction` under `permission_id`.
    ///
    /// A coded `result` (e.g. `PERMISSION_ERROR`) is part of the report; an
    /// `Error` field is a node failure.
    pub async fn get_sign_weight(
        &self,
        transaction: &Transaction,
        permission_id: Option<u32>,
    ) -> Result<SignWeightResult> {
        let mut transaction = transaction.clone();
        if let Some(id) = permission_id.filter(|id| *id > 0) {
            transaction.set_permission_id(id);
        }
        let payload = serde_json::to_value(&transaction)?;
        let response = self
            .post(NodeKind::Full, "wallet/getsignweight", payload)
            .await?;
        let report = reject_error_field(response)?;
        serde_json::from_value(report).map_err(|e| SunError::Serialization(e.to_string()))
    }

    /// Broadcast a signed transaction; a rejection carries the node's code
    pub async fn broadcast(&self, transaction: &Transaction) -> Result<BroadcastResult> {
        let payload = serde_json::to_value(transaction)?;
        let response = self
            .post(NodeKind::Full, "wallet/broadcasttransaction", payload)
            .await?;
        let result: BroadcastResult =
            serde_json::from_value(response).map_err(|e| SunError::Serialization(e.to_string()))?;

        if let Some(code) = result.code.clone().filter(|_| !result.result) {
            let message = result
                .message
                .as_deref()
                .map(decode_node_message)
                .unwrap_or_else(|| code.clone());
            tracing::warn!(tx_id = %transaction.tx_id, %code, "broadcast rejected: {}", message);
            return Err(SunError::Broadcast { code, message });
        }

        tracing::info!(tx_id = %transaction.tx_id, "broadcast accepted");
        Ok(BroadcastResult {
            txid: if result.txid.is_empty() {
                transaction.tx_id.clone()
            } else {
                result.txid
            },
            ..result
        })
    }

    /// Execution receipt; `{}` while the transaction is not yet in a block
    pub async fn transaction_info(&self, tx_id: &str, confirmed: bool) -> Result<Value> {
        let (node, path) = if confirmed {
            (NodeKind::Solidity, "walletsolidity/gettransactioninfobyid")
        } else {
            (NodeKind::Full, "wallet/gettransactioninfobyid")
        };
        self.post(node, path, json!({ "value": tx_id })).await
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("default_address", &self.default_address())
            .field("fee_limit", &self.inner.fee_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, CONTRACT};
    use crate::transport::RecordingTransport;

    fn client() -> (Arc<RecordingTransport>, LedgerClient) {
        let transport = Arc::new(RecordingTransport::new());
        let client = LedgerClient::new(transport.clone());
        (transport, client)
    }

    #[tokio::test]
    async fn test_abi_fetched_once() {
        let (transport, client) = client();
        transport.respond_always(
            "wallet/getcontract",
            json!({"abi": {"entrys": [{"type": "Function", "name": "decimals", "inputs": [],
                                       "outputs": [{"type": "uint8"}]}]}}),
        );

        let first = client.contract_abi(CONTRACT).await.unwrap();
        let second = client
            .contract_abi("41a614f803b6fd780986a42c78ec9c7f77e6ded13c")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.requests_to("wallet/getcontract").len(), 1);

        client.invalidate_abi(CONTRACT);
        assert!(client.cached_abi(CONTRACT).is_none());
    }

    #[tokio::test]
    async fn test_missing_contract() {
        let (transport, client) = client();
        transport.respond("wallet/getcontract", json!({}));
        let err = client.contract_abi(CONTRACT).await.unwrap_err();
        assert_eq!(err, SunError::Remote("Contract does not exist".into()));
    }

    #[tokio::test]
    async fn test_sign_weight_surfaces_node_error() {
        let (transport, client) = client();
        transport.respond("wallet/getsignweight", json!({"Error": "Transaction expired"}));
        let tx = test_support::transaction(test_support::OWNER_HEX);

        let err = client.get_sign_weight(&tx, Some(2)).await.unwrap_err();
        assert_eq!(err, SunError::Remote("Transaction expired".into()));
    }

    #[tokio::test]
    async fn test_sign_weight_keeps_coded_result() {
        let (transport, client) = client();
        transport.respond(
            "wallet/getsignweight",
            json!({"result": {"code": "PERMISSION_ERROR", "message": "5065726d697373696f6e2064656e696564"}}),
        );
        let tx = test_support::transaction(test_support::OWNER_HEX);

        let report = client.get_sign_weight(&tx, Some(2)).await.unwrap();
        assert!(report.is_permission_error());
    }

    #[tokio::test]
    async fn test_broadcast_error_decodes_message() {
        let (transport, client) = client();
        transport.respond(
            "wallet/broadcasttransaction",
            json!({"code": "SIGERROR", "message": "76616c6964617465207369676e6174757265206572726f72"}),
        );
        let tx = test_support::transaction(test_support::OWNER_HEX);
        let err = client.broadcast(&tx).await.unwrap_err();
        assert_eq!(
            err,
            SunError::Broadcast {
                code: "SIGERROR".into(),
                message: "validate signature error".into()
            }
        );
    }

    #[test]
    fn test_set_default_address_drops_foreign_key() {
        let (_, client) = client();
        let key = PrivateKey::generate();
        client.set_private_key(key.clone());
        assert_eq!(client.default_address(), Some(key.address()));

        client.set_default_address(CONTRACT).unwrap();
        assert!(client.default_private_key().is_none());
        assert!(client.set_default_address("nope").is_err());
    }
}
