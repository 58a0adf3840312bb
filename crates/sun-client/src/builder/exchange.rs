//! Bancor exchange pairs

use serde_json::json;
use sun_core::{utf8_to_hex, Result, Transaction};

use super::{object, TransactionBuilder, TxOptions};
use crate::validator::{ParameterValidator, Rule};

/// Token id the exchange uses for the native currency, `_` in hex
const TRX_TOKEN_ID: &str = "5f";

impl TransactionBuilder {
    /// Open a pair between a native token and TRX
    pub async fn create_trx_exchange(
        &self,
        token_name: &str,
        token_balance: i64,
        trx_balance: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("owner", self.actor(owner)),
            Rule::not_empty_string("token name", token_name),
            Rule::positive_integer("token balance", token_balance),
            Rule::positive_integer("TRX balance", trx_balance),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("owner")?,
            "first_token_id": utf8_to_hex(token_name),
            "first_token_balance": token_balance,
            "second_token_id": TRX_TOKEN_ID,
            "second_token_balance": trx_balance,
        }));
        self.submit("wallet/exchangecreate", payload, options).await
    }

    /// Open a pair between two native tokens
    pub async fn create_token_exchange(
        &self,
        first_token: &str,
        first_balance: i64,
        second_token: &str,
        second_balance: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("owner", self.actor(owner)),
            Rule::not_empty_string("first token name", first_token),
            Rule::not_empty_string("second token name", second_token),
            Rule::positive_integer("first token balance", first_balance),
            Rule::positive_integer("second token balance", second_balance),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("owner")?,
            "first_token_id": utf8_to_hex(first_token),
            "first_token_balance": first_balance,
            "second_token_id": utf8_to_hex(second_token),
            "second_token_balance": second_balance,
        }));
        self.submit("wallet/exchangecreate", payload, options).await
    }

    pub async fn inject_exchange_tokens(
        &self,
        exchange_id: i64,
        token_name: &str,
        amount: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        self.move_exchange_tokens("wallet/exchangeinject", exchange_id, token_name, amount, owner, options)
            .await
    }

    pub async fn withdraw_exchange_tokens(
        &self,
        exchange_id: i64,
        token_name: &str,
        amount: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        self.move_exchange_tokens("wallet/exchangewithdraw", exchange_id, token_name, amount, owner, options)
            .await
    }

    /// Sell `sold` of `token_name` into the pair, expecting at least `expected` back
    pub async fn trade_exchange_tokens(
        &self,
        exchange_id: i64,
        token_name: &str,
        sold: i64,
        expected: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("owner", self.actor(owner)),
            Rule::not_empty_string("token name", token_name),
            Rule::integer("tokenAmountSold", sold).gte(1),
            Rule::integer("tokenAmountExpected", expected).gte(1),
            Rule::integer("exchangeID", exchange_id).gte(0),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("owner")?,
            "exchange_id": exchange_id,
            "token_id": utf8_to_hex(token_name),
            "quant": sold,
            "expected": expected,
        }));
        self.submit("wallet/exchangetransaction", payload, options).await
    }

    async fn move_exchange_tokens(
        &self,
        path: &str,
        exchange_id: i64,
        token_name: &str,
        amount: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("owner", self.actor(owner)),
            Rule::not_empty_string("token name", token_name),
            Rule::integer("token amount", amount).gte(1),
            Rule::integer("exchangeID", exchange_id).gte(0),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("owner")?,
            "exchange_id": exchange_id,
            "token_id": utf8_to_hex(token_name),
            "quant": amount,
        }));
        self.submit(path, payload, options).await
    }
}
