//! Account name, id and permission updates

use serde_json::{json, Value};
use sun_core::{utf8_to_hex, Address, PermissionSet, PermissionType, Result, SunError, Transaction};

use super::{object, TransactionBuilder, TxOptions};
use crate::permissions::{canonical_set, check_permissions};
use crate::validator::{ParameterValidator, Rule};

impl TransactionBuilder {
    /// Set the account name (1 to 200 characters)
    pub async fn update_account(
        &self,
        account_name: &str,
        address: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::string("Name", account_name).gt(0).lte(200),
            Rule::address("origin", self.actor(address)),
        ])?;

        let payload = object(json!({
            "account_name": utf8_to_hex(account_name),
            "owner_address": normalized.require_address("origin")?,
        }));
        self.submit("wallet/updateaccount", payload, options).await
    }

    /// Assign a unique account id, given as hex of 8 to 32 characters
    pub async fn set_account_id(
        &self,
        account_id: &str,
        address: Option<&str>,
        options: &TxOptions,
    ) -> Result<Transaction> {
        let normalized = ParameterValidator::validate(vec![
            Rule::hex("accountId", account_id),
            Rule::string("accountId", account_id).gte(8).lte(32),
            Rule::address("origin", self.actor(address)),
        ])?;

        let payload = object(json!({
            "account_id": account_id,
            "owner_address": normalized.require_address("origin")?,
        }));
        self.submit("wallet/setaccountid", payload, options).await
    }

    /// Replace the owner, witness and active permission sets of `owner`.
    ///
    /// A single active set is sent as an object, several as a list.
    pub async fn update_account_permissions(
        &self,
        owner: Option<&str>,
        owner_permissions: Option<&PermissionSet>,
        witness_permissions: Option<&PermissionSet>,
        active_permissions: &[PermissionSet],
        options: &TxOptions,
    ) -> Result<Transaction> {
        let owner = match self.actor(owner) {
            Value::String(s) => Address::parse(&s).ok(),
            _ => None,
        }
        .ok_or_else(|| SunError::Validation("Invalid ownerAddress provided".into()))?;

        if !check_permissions(owner_permissions, PermissionType::Owner) {
            return Err(SunError::Validation("Invalid ownerPermissions provided".into()));
        }
        if !check_permissions(witness_permissions, PermissionType::Witness) {
            return Err(SunError::Validation("Invalid witnessPermissions provided".into()));
        }
        if !active_permissions
            .iter()
            .all(|set| check_permissions(Some(set), PermissionType::Active))
        {
            return Err(SunError::Validation("Invalid activesPermissions provided".into()));
        }

        let mut payload = object(json!({ "owner_address": owner.to_hex() }));
        if let Some(set) = owner_permissions {
            payload.insert("owner".into(), canonical_set(set));
        }
        if let Some(set) = witness_permissions {
            payload.insert("witness".into(), canonical_set(set));
        }
        match active_permissions {
            [] => {}
            [single] => {
                payload.insert("actives".into(), canonical_set(single));
            }
            many => {
                payload.insert(
                    "actives".into(),
                    Value::Array(many.iter().map(canonical_set).collect()),
                );
            }
        }
        self.submit("wallet/accountpermissionupdate", payload, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    const OPERATIONS: &str = "7fff1fc0033e0000000000000000000000000000000000000000000000000000";

    fn active(name: &str) -> PermissionSet {
        PermissionSet::new(PermissionType::Active, name, 1, vec![(CONTRACT.into(), 1)]).with_operations(OPERATIONS)
    }

    #[tokio::test]
    async fn test_single_active_sent_as_scalar() {
        let (transport, client) = recording_client();
        transport.respond_always("wallet/accountpermissionupdate", transaction_json(OWNER_HEX));
        let owner = PermissionSet::new(PermissionType::Owner, "owner", 1, vec![(OWNER.into(), 1)]);

        client
            .transaction_builder()
            .update_account_permissions(None, Some(&owner), None, &[active("a")], &TxOptions::default())
            .await
            .unwrap();

        let payload = sole_payload(&transport, "wallet/accountpermissionupdate");
        assert_eq!(payload["owner_address"], OWNER_HEX);
        assert_eq!(payload["owner"]["keys"][0]["address"], OWNER_HEX);
        assert!(payload["actives"].is_object());
        assert_eq!(payload["actives"]["keys"][0]["address"], CONTRACT_HEX);
        assert!(payload.get("witness").is_none());
    }

    #[tokio::test]
    async fn test_several_actives_sent_as_list() {
        let (transport, client) = recording_client();
        transport.respond_always("wallet/accountpermissionupdate", transaction_json(OWNER_HEX));

        client
            .transaction_builder()
            .update_account_permissions(None, None, None, &[active("a"), active("b")], &TxOptions::default())
            .await
            .unwrap();
        let payload = sole_payload(&transport, "wallet/accountpermissionupdate");
        assert_eq!(payload["actives"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_invalid_sets_named_in_error() {
        let (transport, client) = recording_client();
        let builder = client.transaction_builder();

        let heavy = PermissionSet::new(PermissionType::Owner, "owner", 1, vec![(OWNER.into(), 2)]);
        let err = builder
            .update_account_permissions(None, Some(&heavy), None, &[], &TxOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, SunError::Validation("Invalid ownerPermissions provided".into()));

        let mut no_ops = active("a");
        no_ops.operations = None;
        let err = builder
            .update_account_permissions(None, None, None, &[no_ops], &TxOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, SunError::Validation("Invalid activesPermissions provided".into()));

        let err = builder
            .update_account_permissions(Some("T000"), None, None, &[], &TxOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, SunError::Validation("Invalid ownerAddress provided".into()));

        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_set_account_id_length() {
        let (transport, client) = recording_client();
        transport.respond_always("wallet/setaccountid", transaction_json(OWNER_HEX));
        let builder = client.transaction_builder();

        let err = builder.set_account_id("616263", None, &TxOptions::default()).await.unwrap_err();
        assert_eq!(err, SunError::Validation("Invalid accountId provided".into()));

        builder.set_account_id("6162636465666768", None, &TxOptions::default()).await.unwrap();
        assert_eq!(sole_payload(&transport, "wallet/setaccountid")["account_id"], "6162636465666768");
    }

    #[tokio::test]
    async fn test_update_account_name() {
        let (transport, client) = recording_client();
        transport.respond_always("wallet/updateaccount", transaction_json(OWNER_HEX));
        let builder = client.transaction_builder();

        assert!(builder.update_account("", None, &TxOptions::default()).await.is_err());
        builder.update_account("sun", None, &TxOptions::default()).await.unwrap();
        assert_eq!(sole_payload(&transport, "wallet/updateaccount")["account_name"], "73756e");
    }
}
