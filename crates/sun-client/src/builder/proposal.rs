//! Network parameter proposals

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sun_core::{Result, SunError, Transaction};

use super::{object, TransactionBuilder, TxOptions};
use crate::validator::{ParameterValidator, Rule};

/// One chain parameter change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalParameter {
    pub key: i64,
    pub value: i64,
}

impl ProposalParameter {
    pub fn new(key: i64, value: i64) -> Self {
        Self { key, value }
    }
}

impl TransactionBuilder {
    pub async fn create_proposal(
        &self,
        parameters: &[ProposalParameter],
        issuer: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![Rule::address("issuer", self.actor(issuer))])?;
        if parameters.is_empty() {
            return Err(SunError::Validation("Invalid proposal parameters provided".into()));
        }

        let payload = object(json!({
            "owner_address": normalized.require_address("issuer")?,
            "parameters": parameters,
        }));
        self.submit("wallet/proposalcreate", payload, options).await
    }

    pub async fn delete_proposal(
        &self,
        proposal_id: i64,
        issuer: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("issuer", self.actor(issuer)),
            Rule::integer("proposalID", proposal_id).gte(0),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("issuer")?,
            "proposal_id": proposal_id,
        }));
        self.submit("wallet/proposaldelete", payload, options).await
    }

    /// Approve (`true`) or withdraw approval (`false`) for a proposal
    pub async fn vote_proposal(
        &self,
        proposal_id: i64,
        approve: bool,
        voter: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::address("voter", self.actor(voter)),
            Rule::integer("proposalID", proposal_id).gte(0),
            Rule::boolean("has approval", Value::Bool(approve)),
        ])?;

        let payload = object(json!({
            "owner_address": normalized.require_address("voter")?,
            "proposal_id": proposal_id,
            "is_add_approval": approve,
        }));
        self.submit("wallet/proposalapprove", payload, options).await
    }
}
