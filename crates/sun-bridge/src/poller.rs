//! Receipt polling
//!
//! A bounded loop against the solidity node: an empty receipt means the
//! transaction is not in a confirmed block yet, anything else is terminal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sun_client::LedgerClient;
use sun_core::{decode_node_message, Result, SunError, TransactionInfo};
use tokio_util::sync::CancellationToken;

/// Receipt fetches before giving up
pub const POLL_ATTEMPTS: u32 = 20;

/// Spacing between receipt fetches
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Clock seam so tests can poll without waiting
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What a successful poll hands back
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiptOutput {
    /// The receipt as returned by the node
    Raw,
    /// The first contract result decoded with these output types; a single
    /// value is unwrapped
    Decoded(Vec<String>),
}

/// Bounded receipt poller
#[derive(Clone)]
pub struct ReceiptPoller {
    client: LedgerClient,
    sleeper: Arc<dyn Sleeper>,
    attempts: u32,
    interval: Duration,
    cancel: CancellationToken,
}

impl ReceiptPoller {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            client,
            sleeper: Arc::new(TokioSleeper),
            attempts: POLL_ATTEMPTS,
            interval: POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_schedule(mut self, attempts: u32, interval: Duration) -> Self {
        self.attempts = attempts;
        self.interval = interval;
        self
    }

    /// Stop early when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Poll until the receipt for `tx_id` is terminal
    pub async fn wait(&self, tx_id: &str, output: &ReceiptOutput) -> Result<Value> {
        for attempt in 1..=self.attempts {
            if self.cancel.is_cancelled() {
                return Err(SunError::Cancelled);
            }

            let receipt = self.client.transaction_info(tx_id, true).await?;
            if receipt.as_object().map_or(true, |o| o.is_empty()) {
                tracing::debug!(tx_id, attempt, "receipt not available yet");
                if attempt < self.attempts {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(SunError::Cancelled),
                        _ = self.sleeper.sleep(self.interval) => {}
                    }
                }
                continue;
            }

            return self.interpret(tx_id, receipt, output);
        }

        tracing::warn!(tx_id, attempts = self.attempts, "receipt polling exhausted");
        Err(SunError::Timeout {
            attempts: self.attempts,
            tx_id: tx_id.to_string(),
        })
    }

    fn interpret(&self, tx_id: &str, receipt: Value, output: &ReceiptOutput) -> Result<Value> {
        let info: TransactionInfo = serde_json::from_value(receipt.clone())?;

        if info.is_failed() {
            let message = info
                .res_message
                .as_deref()
                .map(decode_node_message)
                .unwrap_or_default();
            tracing::warn!(tx_id, "execution failed: {}", message);
            return Err(SunError::ExecutionFailed {
                tx_id: tx_id.to_string(),
                message,
            });
        }

        let Some(results) = info.contract_result else {
            return Err(SunError::ExecutionFailed {
                tx_id: tx_id.to_string(),
                message: format!("Failed to execute: {}", receipt),
            });
        };

        match output {
            ReceiptOutput::Raw => Ok(receipt),
            ReceiptOutput::Decoded(types) => {
                let data = results.first().map(String::as_str).unwrap_or_default();
                let bytes = hex::decode(data)
                    .map_err(|e| SunError::Encoding(format!("Invalid contract result: {}", e)))?;
                let mut values = self.client.codec().decode(types, &bytes)?;
                Ok(if values.len() == 1 {
                    values.remove(0)
                } else {
                    Value::Array(values)
                })
            }
        }
    }
}

impl std::fmt::Debug for ReceiptPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptPoller")
            .field("attempts", &self.attempts)
            .field("interval", &self.interval)
            .finish()
    }
}
