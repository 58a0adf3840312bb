//! Post-processing of unsigned transactions
//!
//! Any change to `raw_data` invalidates the txID, so every alteration ends
//! with a round trip through `wallet/getsignweight` to have the node
//! re-derive it.

use sun_core::{is_hex, strip_0x, utf8_to_hex, Result, SunError, Transaction};

use super::{now_millis, TransactionBuilder};
use crate::transport::NodeKind;

/// Encoding of data passed to [`TransactionBuilder::add_update_data`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataFormat {
    #[default]
    Utf8,
    Hex,
}

/// Minimum distance between now and a new expiration, in ms
const MIN_EXPIRATION_LEAD_MS: i64 = 3_000;

impl TransactionBuilder {
    /// Have the node recompute txID and `raw_data_hex` for `transaction`
    pub async fn new_tx_id(&self, transaction: &Transaction) -> Result<Transaction> {
        let payload = serde_json::to_value(transaction)?;
        let response = self
            .client()
            .post(NodeKind::Full, "wallet/getsignweight", payload)
            .await?;

        let body = response
            .get("transaction")
            .and_then(|t| t.get("transaction"))
            .cloned()
            .ok_or_else(|| SunError::Remote(format!("Unable to reissue transaction id: {}", response)))?;
        let mut reissued: Transaction = serde_json::from_value(body)?;
        reissued.visible = transaction.visible;

        tracing::debug!(old = %transaction.tx_id, new = %reissued.tx_id, "transaction id reissued");
        Ok(reissued)
    }

    /// Push the expiration of an unsigned transaction out by `seconds`
    pub async fn extend_expiration(&self, transaction: &Transaction, seconds: i64) -> Result<Transaction> {
        ensure_unsigned(transaction, "extend the expiration of")?;

        let expiration = transaction
            .raw_data
            .expiration
            .checked_add(seconds.saturating_mul(1000))
            .filter(|expiration| *expiration > now_millis() + MIN_EXPIRATION_LEAD_MS)
            .ok_or_else(|| SunError::Validation("Invalid extension provided".into()))?;

        let mut altered = transaction.clone();
        altered.raw_data.expiration = expiration;
        self.new_tx_id(&altered).await
    }

    /// Attach a memo to the `data` field of an unsigned transaction
    pub async fn add_update_data(&self, transaction: &Transaction, data: &str, format: DataFormat) -> Result<Transaction> {
        ensure_unsigned(transaction, "add data to")?;

        let data = match format {
            DataFormat::Hex if is_hex(data) => strip_0x(data).to_string(),
            DataFormat::Hex => String::new(),
            DataFormat::Utf8 => utf8_to_hex(data),
        };
        if data.is_empty() {
            return Err(SunError::Validation("Invalid data provided".into()));
        }

        let mut altered = transaction.clone();
        altered.raw_data.data = Some(data);
        self.new_tx_id(&altered).await
    }
}

/// `action` completes "You can not ... a signed transaction."
fn ensure_unsigned(transaction: &Transaction, action: &str) -> Result<()> {
    if transaction.is_signed() {
        return Err(SunError::Validation(format!(
            "You can not {} a signed transaction.",
            action
        )));
    }
    Ok(())
}
