//! Transaction signing for both chains
//!
//! The main chain signs the txID directly. The side chain signs
//! `SHA-256(txID ‖ chainId)` so a signature is never valid on both chains.

use sun_client::LedgerClient;
use sun_core::{decode_node_message, to_canonical_hex, Result, SunError, Transaction};
use sun_crypto::{sha256_concat, PrivateKey};

/// Which chain a signature is produced for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SigningDomain {
    MainChain,
    SideChain { chain_id: Vec<u8> },
}

impl SigningDomain {
    /// Digest the signature is computed over
    pub fn digest(&self, transaction: &Transaction) -> Result<Vec<u8>> {
        let tx_id = transaction
            .tx_id_bytes()
            .map_err(|_| SunError::Signing(format!("Invalid transaction id: {}", transaction.tx_id)))?;
        Ok(match self {
            Self::MainChain => tx_id,
            Self::SideChain { chain_id } => sha256_concat(&[tx_id.as_slice(), chain_id.as_slice()]).to_vec(),
        })
    }
}

/// Options for [`sign`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// Non-owner permission to co-sign under
    pub permission_id: Option<u32>,
    /// Skip the signer / owner address comparison
    pub skip_owner_check: bool,
}

/// The explicit key, or the client's default identity
pub fn resolve_key(client: &LedgerClient, explicit: Option<&str>) -> Result<PrivateKey> {
    match explicit {
        Some(hex) => {
            PrivateKey::from_hex(hex).map_err(|_| SunError::Signing("Invalid private key provided".into()))
        }
        None => client
            .default_private_key()
            .ok_or_else(|| SunError::Signing("No private key available".into())),
    }
}

/// Sign `transaction` in place; `false` if the same signature was already attached
pub fn sign_transaction(transaction: &mut Transaction, key: &PrivateKey, domain: &SigningDomain) -> Result<bool> {
    let digest = domain.digest(transaction)?;
    let signature = key.sign_digest_hex(&digest)?;
    Ok(transaction.add_signature(signature))
}

/// Sign for submission.
///
/// With a non-zero permission id on a transaction that carries none yet,
/// this is the multisig flow of [`multi_sign`]. Otherwise the signer must be
/// the transaction owner unless the check is skipped or the transaction is
/// already bound to a non-owner permission.
pub async fn sign(
    client: &LedgerClient,
    transaction: Transaction,
    key: &PrivateKey,
    domain: &SigningDomain,
    options: &SignOptions,
) -> Result<Transaction> {
    let bound_permission = transaction.permission_id().filter(|id| *id > 0);

    if let Some(permission_id) = options.permission_id.filter(|id| *id > 0) {
        if bound_permission.is_none() {
            return multi_sign(client, &transaction, key, permission_id, domain).await;
        }
    }

    if !options.skip_owner_check && bound_permission.is_none() {
        let signer = key.address().to_hex();
        if transaction.owner_address().as_deref() != Some(signer.as_str()) {
            return Err(SunError::Signing(
                "Private key does not match address in transaction".into(),
            ));
        }
    }

    let mut transaction = transaction;
    if !sign_transaction(&mut transaction, key, domain)? {
        tracing::debug!(tx_id = %transaction.tx_id, "signature already present");
    }
    Ok(transaction)
}

/// Co-sign under `permission_id` after checking the remote sign-weight report.
///
/// The report is only as fresh as the request; two signers racing on the
/// same transaction can both pass the already-signed check.
pub async fn multi_sign(
    client: &LedgerClient,
    transaction: &Transaction,
    key: &PrivateKey,
    permission_id: u32,
    domain: &SigningDomain,
) -> Result<Transaction> {
    let report = client.get_sign_weight(transaction, Some(permission_id)).await?;
    if report.is_permission_error() {
        let message = report
            .result
            .message
            .as_deref()
            .map(decode_node_message)
            .unwrap_or_else(|| report.result.code.clone().unwrap_or_default());
        return Err(SunError::Permission(message));
    }

    let signer = key.address();
    let signer_hex = signer.to_hex();
    let is_signer = |candidate: &str| to_canonical_hex(candidate).map_or(false, |hex| hex == signer_hex);

    let listed = report
        .permission
        .as_ref()
        .map_or(false, |p| p.keys.iter().any(|k| is_signer(&k.address)));
    if !listed {
        return Err(SunError::Permission(format!(
            "{} has no permission to sign",
            signer.to_base58()
        )));
    }
    if report.approved_list.iter().any(|a| is_signer(a)) {
        return Err(SunError::Permission(format!(
            "{} already signed transaction",
            signer.to_base58()
        )));
    }

    let mut canonical = report
        .canonical_transaction()
        .cloned()
        .ok_or_else(|| SunError::Remote("Sign weight report carried no transaction".into()))?;
    canonical.set_permission_id(permission_id);

    sign_transaction(&mut canonical, key, domain)?;
    tracing::debug!(tx_id = %canonical.tx_id, permission_id, signer = %signer, "co-signed");
    Ok(canonical)
}
