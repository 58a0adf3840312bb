//! Value and token transfers

use serde_json::json;
use sun_core::{utf8_to_hex, Result, Transaction};

use super::{object, TransactionBuilder, TxOptions};
use crate::validator::{ParameterValidator, Rule};

impl TransactionBuilder {
    /// Transfer `amount` sun from `from` (default address) to `to`
    pub async fn send_trx(
        &self,
        to: &str,
        amount: i64,
        from: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("recipient", to),
            Rule::address("origin", self.actor(from)),
            Rule::not_equal("recipient", "origin").msg("Cannot transfer TRX to the same account"),
            Rule::integer("amount", amount).gt(0),
        ])?;

        let payload = object(json!({
            "to_address": normalized.require_address("recipient")?,
            "owner_address": normalized.require_address("origin")?,
            "amount": amount,
        }));
        self.submit("wallet/createtransaction", payload, options).await
    }

    /// Transfer `amount` of the native token `token_id`
    pub async fn send_token(
        &self,
        to: &str,
        amount: i64,
        token_id: &str,
        from: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("recipient", to),
            Rule::address("origin", self.actor(from)),
            Rule::not_equal("recipient", "origin").msg("Cannot transfer tokens to the same account"),
            Rule::integer("amount", amount).gt(0),
            Rule::token_id("token ID", token_id),
        ])?;

        let payload = object(json!({
            "to_address": normalized.require_address("recipient")?,
            "owner_address": normalized.require_address("origin")?,
            "asset_name": utf8_to_hex(token_id),
            "amount": amount,
        }));
        self.submit("wallet/transferasset", payload, options).await
    }

    /// Buy `amount` of `token_id` from its issuer during the sale window
    pub async fn purchase_token(
        &self,
        issuer: &str,
        token_id: &str,
        amount: i64,
        buyer: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("buyer", self.actor(buyer)),
            Rule::address("issuer", issuer),
            Rule::not_equal("buyer", "issuer").msg("Cannot purchase tokens from same account"),
            Rule::integer("amount", amount).gt(0),
            Rule::token_id("token ID", token_id),
        ])?;

        let payload = object(json!({
            "to_address": normalized.require_address("issuer")?,
            "owner_address": normalized.require_address("buyer")?,
            "asset_name": utf8_to_hex(token_id),
            "amount": amount,
        }));
        self.submit("wallet/participateassetissue", payload, options).await
    }
}
