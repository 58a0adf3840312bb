//! Super representative registration, voting and brokerage

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use sun_core::{utf8_to_hex, Address, Result, Transaction};

use super::{object, TransactionBuilder, TxOptions};
use crate::validator::{ParameterValidator, Rule};

impl TransactionBuilder {
    /// Register `address` as a super representative candidate with a public `url`
    pub async fn apply_for_sr(
        &self,
        address: Option<&str>,
        url: &str,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("origin", self.actor(address)),
            Rule::url("url", url).msg("Invalid url provided"),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("origin")?,
            "url": utf8_to_hex(url),
        }));
        self.submit("wallet/createwitness", payload, options).await
    }

    /// Cast votes: SR address -> vote count
    pub async fn vote(
        &self,
        votes: &BTreeMap<String, i64>,
        voter: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let as_object: Map<String, Value> = votes
            .iter()
            .map(|(sr, count)| (sr.clone(), Value::from(*count)))
            .collect();

        let normalized = ParameterValidator::validate(vec![
            Rule::address("voter", self.actor(voter)),
            Rule::not_empty_object("votes", Value::Object(as_object)),
        ])?;

        let mut entries = Vec::with_capacity(votes.len());
        for (sr, count) in votes {
            ParameterValidator::validate(vec![
                Rule::address("SR", sr.as_str()),
                Rule::integer("vote count", *count)
                    .gt(0)
                    .msg(format!("Invalid vote count provided for SR: {}", sr)),
            ])?;
            entries.push(json!({
                "vote_address": Address::parse(sr)?.to_hex(),
                "vote_count": count,
            }));
        }

        let payload = object(json!({
            "owner_address": normalized.require_address("voter")?,
            "votes": entries,
        }));
        self.submit("wallet/votewitnessaccount", payload, options).await
    }

    /// Set the share of rewards an SR keeps, in percent
    pub async fn update_brokerage(
        &self,
        brokerage: i64,
        owner: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::integer("brokerage", brokerage).gte(0).lte(100),
            Rule::address("origin", self.actor(owner)),
        ])?;

        let payload = object(json!({
            "brokerage": brokerage,
            "owner_address": normalized.require_address("origin")?,
        }));
        self.submit("wallet/updateBrokerage", payload, options).await
    }
}
