//! Native token issuance and update

use serde_json::{json, Value};
use sun_core::{utf8_to_hex, Result, Transaction};

use super::{now_millis, object, TransactionBuilder, TxOptions};
use crate::validator::{ParameterValidator, Rule};

/// Parameters of a new native token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateTokenOptions {
    pub name: String,
    pub abbreviation: String,
    pub description: String,
    pub url: String,
    pub total_supply: i64,
    /// TRX side of the sale price
    pub trx_ratio: i64,
    /// Token side of the sale price
    pub token_ratio: i64,
    /// Sale start in ms; now when unset
    pub sale_start: Option<i64>,
    pub sale_end: Option<i64>,
    pub free_bandwidth: i64,
    pub free_bandwidth_limit: i64,
    pub frozen_amount: i64,
    pub frozen_duration: i64,
    pub vote_score: Option<i64>,
    pub precision: Option<i64>,
}

impl Default for CreateTokenOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            abbreviation: String::new(),
            description: String::new(),
            url: String::new(),
            total_supply: 0,
            trx_ratio: 1,
            token_ratio: 1,
            sale_start: None,
            sale_end: None,
            free_bandwidth: 0,
            free_bandwidth_limit: 0,
            frozen_amount: 0,
            frozen_duration: 0,
            vote_score: None,
            precision: None,
        }
    }
}

/// Mutable fields of an issued token
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateTokenOptions {
    pub description: String,
    pub url: String,
    pub free_bandwidth: i64,
    pub free_bandwidth_limit: i64,
}

impl TransactionBuilder {
    /// Issue a native token owned by `issuer`
    pub async fn create_token(
        &self,
        token: &CreateTokenOptions,
        issuer: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let now = now_millis();
        let sale_start = token.sale_start.unwrap_or(now);

        let normalized = ParameterValidator::validate(vec![
            Rule::positive_integer("Supply amount", token.total_supply),
            Rule::positive_integer("TRX ratio", token.trx_ratio),
            Rule::positive_integer("Token ratio", token.token_ratio),
            Rule::not_empty_string("token abbreviation", token.abbreviation.as_str()),
            Rule::not_empty_string("token name", token.name.as_str()),
            Rule::string("token description", token.description.as_str()).lte(200),
            Rule::url("token url", token.url.as_str()),
            Rule::string("token url", token.url.as_str()).lte(256),
            Rule::address("issuer", self.actor(issuer)),
            Rule::integer("sale start timestamp", sale_start).gte(now),
            Rule::integer("sale end timestamp", token.sale_end).gt(sale_start),
            Rule::integer("Free bandwidth amount", token.free_bandwidth).gte(0),
            Rule::integer("Free bandwidth limit", token.free_bandwidth_limit).gte(0),
            Rule::integer("Frozen supply", token.frozen_amount).gte(0),
            Rule::integer("Frozen duration", token.frozen_duration).gte(0),
            Rule::integer("vote score", token.vote_score)
                .gt(0)
                .optional()
                .msg("voteScore must be a positive integer greater than 0"),
            Rule::integer("precision", token.precision)
                .gte(0)
                .lte(6)
                .optional()
                .msg("precision must be a positive integer >= 0 and <= 6"),
        ])?;

        let mut payload = object(json!({
            "owner_address": normalized.require_address("issuer")?,
            "name": utf8_to_hex(&token.name),
            "abbr": utf8_to_hex(&token.abbreviation),
            "description": utf8_to_hex(&token.description),
            "url": utf8_to_hex(&token.url),
            "total_supply": token.total_supply,
            "trx_num": token.trx_ratio,
            "num": token.token_ratio,
            "start_time": sale_start,
            "end_time": token.sale_end,
            "free_asset_net_limit": token.free_bandwidth,
            "public_free_asset_net_limit": token.free_bandwidth_limit,
        }));
        if token.frozen_amount > 0 {
            payload.insert(
                "frozen_supply".into(),
                json!({
                    "frozen_amount": token.frozen_amount,
                    "frozen_days": token.frozen_duration,
                }),
            );
        }
        if let Some(precision) = token.precision {
            payload.insert("precision".into(), Value::from(precision));
        }
        if let Some(score) = token.vote_score {
            payload.insert("vote_score".into(), Value::from(score));
        }
        self.submit("wallet/createassetissue", payload, options).await
    }

    /// Update description, url and free bandwidth of the issuer's token
    pub async fn update_token(
        &self,
        token: &UpdateTokenOptions,
        issuer: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::string("token description", token.description.as_str()).lte(200),
            Rule::url("token url", token.url.as_str()),
            Rule::string("token url", token.url.as_str()).lte(256),
            Rule::address("issuer", self.actor(issuer)),
            Rule::positive_integer("Free bandwidth amount", token.free_bandwidth),
            Rule::positive_integer("Free bandwidth limit", token.free_bandwidth_limit),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("issuer")?,
            "description": utf8_to_hex(&token.description),
            "url": utf8_to_hex(&token.url),
            "new_limit": token.free_bandwidth,
            "new_public_limit": token.free_bandwidth_limit,
        }));
        self.submit("wallet/updateasset", payload, options).await
    }
}
