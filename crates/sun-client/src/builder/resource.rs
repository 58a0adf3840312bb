//! Resource staking and reward withdrawal

use serde_json::{json, Value};
use sun_core::{ResourceType, Result, Transaction};

use super::{object, TransactionBuilder, TxOptions};
use crate::validator::{ParameterValidator, Rule};

/// Minimum staking period, in days
pub const MIN_FREEZE_DURATION: i64 = 3;

impl TransactionBuilder {
    /// Stake `amount` sun for `duration` days (minimum 3), optionally on behalf of `receiver`
    pub async fn freeze_balance(
        &self,
        amount: i64,
        duration: Option<i64>,
        resource: Option<ResourceType>,
        address: Option<&str>,
        receiver: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let duration = duration.unwrap_or(MIN_FREEZE_DURATION);
        let resource = resource.unwrap_or_default();

        let normalized = ParameterValidator::validate(vec![
            Rule::address("origin", self.actor(address)),
            Rule::address("receiver", receiver.map(str::to_string)).optional(),
            Rule::integer("amount", amount).gt(0),
            Rule::integer("duration", duration)
                .gte(MIN_FREEZE_DURATION)
                .msg("Invalid duration provided, minimum of 3 days"),
            Rule::resource("resource", resource.as_str()),
        ])?;

        let owner = normalized.require_address("origin")?;
        let mut payload = object(json!({
            "owner_address": owner,
            "frozen_balance": amount,
            "frozen_duration": duration,
            "resource": resource.as_str(),
        }));
        if let Some(receiver) = normalized.address("receiver").filter(|r| *r != owner) {
            payload.insert("receiver_address".into(), Value::String(receiver.to_string()));
        }
        self.submit("wallet/freezebalance", payload, options).await
    }

    /// Release staked `resource`, optionally the share delegated to `receiver`
    pub async fn unfreeze_balance(
        &self,
        resource: Option<ResourceType>,
        address: Option<&str>,
        receiver: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let resource = resource.unwrap_or_default();

        let normalized = ParameterValidator::validate(vec![
            Rule::address("origin", self.actor(address)),
            Rule::address("receiver", receiver.map(str::to_string)).optional(),
            Rule::resource("resource", resource.as_str()),
        ])?;

        let owner = normalized.require_address("origin")?;
        let mut payload = object(json!({
            "owner_address": owner,
            "resource": resource.as_str(),
        }));
        if let Some(receiver) = normalized.address("receiver").filter(|r| *r != owner) {
            payload.insert("receiver_address".into(), Value::String(receiver.to_string()));
        }
        self.submit("wallet/unfreezebalance", payload, options).await
    }

    /// Claim accumulated block and vote rewards
    pub async fn withdraw_block_rewards(
        &self,
        address: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![Rule::address("origin", self.actor(address))])?;

        let payload = object(json!({ "owner_address": normalized.require_address("origin")? }));
        self.submit("wallet/withdrawbalance", payload, options).await
    }
}
