//! Transaction builder
//!
//! Each operation validates its arguments, canonicalizes addresses and
//! text fields, posts the operation payload to its node path and returns
//! the unsigned transaction the node assembled. Validation failures never
//! reach the network.

mod account;
mod alter;
mod asset;
mod contract;
mod exchange;
mod proposal;
mod resource;
mod transfer;
mod witness;

pub use alter::DataFormat;
pub use asset::{CreateTokenOptions, UpdateTokenOptions};
pub use contract::{CallParameter, DeployOptions, TriggerOptions, MAX_ORIGIN_ENERGY_LIMIT};
pub use proposal::ProposalParameter;

use serde_json::{Map, Value};
use sun_core::{Result, Transaction};

use crate::client::LedgerClient;

/// Options shared by every builder operation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxOptions {
    /// Signing permission; zero or `None` means the owner permission
    pub permission_id: Option<u32>,
}

impl TxOptions {
    pub fn with_permission(permission_id: u32) -> Self {
        Self {
            permission_id: Some(permission_id),
        }
    }
}

/// Builds unsigned transactions against one client context
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    client: LedgerClient,
}

impl TransactionBuilder {
    pub fn new(client: LedgerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &LedgerClient {
        &self.client
    }

    /// The given address, or the client's default address, as a rule value
    fn actor(&self, explicit: Option<&str>) -> Value {
        match explicit {
            Some(address) => Value::String(address.to_string()),
            None => self
                .client
                .default_address()
                .map(|a| Value::String(a.to_hex()))
                .unwrap_or(Value::Null),
        }
    }

    async fn submit(&self, path: &str, payload: Map<String, Value>, options: &TxOptions) -> Result<Transaction> {
        let payload = with_permission(payload, options);
        let transaction = self.client.request_transaction(path, Value::Object(payload)).await?;
        tracing::debug!(path, tx_id = %transaction.tx_id, "transaction built");
        Ok(transaction)
    }
}

/// Attach `Permission_id` when a non-owner permission is requested
pub(crate) fn with_permission(mut payload: Map<String, Value>, options: &TxOptions) -> Map<String, Value> {
    if let Some(id) = options.permission_id.filter(|id| *id > 0) {
        payload.insert("Permission_id".into(), Value::from(id));
    }
    payload
}

/// Unwrap a `json!` object literal
pub(crate) fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Wall clock in milliseconds since the epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
