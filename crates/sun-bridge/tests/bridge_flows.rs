//! End-to-end bridge flows over a scripted transport

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sun_bridge::prelude::*;
use sun_bridge::{CancellationToken, Sleeper};
use sun_client::{LedgerClient, RecordingTransport};
use sun_core::{SunError, Transaction};
use sun_crypto::{recover_address, sha256_concat, PrivateKey};

const OWNER_HEX: &str = "417e5f4552091a69125d5dfcb7b8c2659029395bdf";
const MAIN: &str = "TWaPZru6PR5VjgT4sJrrZ481Zgp3iJ8Rfo";
const MAIN_HEX: &str = "41e209e4de650f0150788e8ec5cafa240a23eb8eb7";
const SIDE: &str = "TGKotco6YoULzbYisTBuP6DWXDjEgJSpYz";
const SIDE_HEX: &str = "4145b632a0bff61ff1b372ff6dd22f64188e620764";
const CHAIN_ID: &str = "41e209e4de650f0150788e8ec5cafa240a23eb8eb7";
const TOKEN: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
const TOKEN_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";
const TX_ID: &str = "7b1c4f3e2d6a5b8c9d0e1f2a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e";

const TRIGGER: &str = "wallet/triggersmartcontract";
const BROADCAST: &str = "wallet/broadcasttransaction";
const RECEIPT: &str = "walletsolidity/gettransactioninfobyid";
const SIGN_WEIGHT: &str = "wallet/getsignweight";

#[derive(Default)]
struct CountingSleeper(AtomicUsize);

#[async_trait]
impl Sleeper for CountingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct CancellingSleeper(CancellationToken);

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.0.cancel();
        std::future::pending::<()>().await;
    }
}

struct Harness {
    main: Arc<RecordingTransport>,
    side: Arc<RecordingTransport>,
    sleeper: Arc<CountingSleeper>,
    bridge: SidechainBridge,
}

fn owner_key() -> PrivateKey {
    PrivateKey::from_hex(&format!("{:064x}", 1)).unwrap()
}

fn config() -> BridgeGatewayConfig {
    BridgeGatewayConfig::new(MAIN, SIDE, CHAIN_ID)
}

fn harness() -> Harness {
    let main = Arc::new(RecordingTransport::new());
    let side = Arc::new(RecordingTransport::new());
    let sleeper = Arc::new(CountingSleeper::default());

    let bridge = SidechainBridge::new(LedgerClient::new(main.clone()), LedgerClient::new(side.clone()), &config())
        .unwrap()
        .with_sleeper(sleeper.clone());
    bridge.set_private_key(owner_key());

    Harness {
        main,
        side,
        sleeper,
        bridge,
    }
}

fn transaction_json() -> Value {
    json!({
        "visible": false,
        "txID": TX_ID,
        "raw_data": {
            "contract": [{
                "parameter": {
                    "value": {"owner_address": OWNER_HEX, "contract_address": MAIN_HEX, "data": "00"},
                    "type_url": "type.googleapis.com/protocol.TriggerSmartContract"
                },
                "type": "TriggerSmartContract"
            }],
            "ref_block_bytes": "0a1b",
            "ref_block_hash": "3c4d5e6f708192a3",
            "expiration": 4_102_444_800_000i64,
            "fee_limit": 10_000_000,
            "timestamp": 4_102_444_740_000i64
        },
        "raw_data_hex": "0a020a1b"
    })
}

fn script_send(transport: &RecordingTransport) {
    transport
        .respond_always(TRIGGER, json!({"result": {"result": true}, "transaction": transaction_json()}))
        .respond_always(BROADCAST, json!({"result": true, "txid": TX_ID}));
}

fn word(hex_body: &str) -> String {
    format!("{:0>64}", hex_body)
}

fn polling() -> BridgeCallOptions {
    BridgeCallOptions {
        should_poll_response: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn deposit_trc20_approves_then_deposits() {
    let h = harness();
    script_send(&h.main);

    let outcome = h
        .bridge
        .deposit_trc20(100, 0, 10_000_000, TOKEN, &BridgeCallOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Submitted(TX_ID.into()));

    let triggers = h.main.requests_to(TRIGGER);
    assert_eq!(triggers.len(), 2);

    let approve = &triggers[0].payload;
    assert_eq!(approve["function_selector"], "approve(address,uint256)");
    assert_eq!(approve["contract_address"], TOKEN_HEX);
    assert_eq!(approve["fee_limit"], 10_000_000);
    assert_eq!(approve["parameter"], format!("{}{}", word(&MAIN_HEX[2..]), word("64")));

    let deposit = &triggers[1].payload;
    assert_eq!(deposit["function_selector"], "depositTRC20(address,uint64)");
    assert_eq!(deposit["contract_address"], MAIN_HEX);
    assert_eq!(deposit["owner_address"], OWNER_HEX);
    assert_eq!(deposit["fee_limit"], 10_000_000);
    assert_eq!(deposit["call_value"], 0);
    assert_eq!(deposit["parameter"], format!("{}{}", word(&TOKEN_HEX[2..]), word("64")));

    let broadcasts = h.main.requests_to(BROADCAST);
    assert_eq!(broadcasts.len(), 2);
    assert_eq!(broadcasts[1].payload["signature"].as_array().map(Vec::len), Some(1));
    assert_eq!(h.side.request_count(), 0);
}

#[tokio::test]
async fn deposit_is_signed_over_plain_tx_id() {
    let h = harness();
    script_send(&h.main);

    h.bridge
        .deposit_trx(1_000, 10, 5_000_000, &BridgeCallOptions::default(), None)
        .await
        .unwrap();

    let trigger = &h.main.requests_to(TRIGGER)[0].payload;
    assert_eq!(trigger["function_selector"], "depositTRX()");
    assert_eq!(trigger["call_value"], 1_010);

    let broadcast = &h.main.requests_to(BROADCAST)[0].payload;
    let signature = hex::decode(broadcast["signature"][0].as_str().unwrap()).unwrap();
    let digest = hex::decode(TX_ID).unwrap();
    assert_eq!(recover_address(&digest, &signature).unwrap(), owner_key().address());
}

#[tokio::test]
async fn unconfigured_side_gateway_fails_before_any_request() {
    let main = Arc::new(RecordingTransport::new());
    let side = Arc::new(RecordingTransport::new());

    let config = BridgeGatewayConfig::new(MAIN, "", CHAIN_ID);
    let err = SidechainBridge::new(LedgerClient::new(main.clone()), LedgerClient::new(side.clone()), &config)
        .unwrap_err();

    assert_eq!(err, SunError::Configuration("Invalid side gateway address provided".into()));
    assert_eq!(main.request_count() + side.request_count(), 0);
}

#[tokio::test]
async fn setters_revalidate() {
    let h = harness();
    let before = h.bridge.gateways();

    assert!(matches!(h.bridge.set_side_chain_id("not hex"), Err(SunError::Configuration(_))));
    assert!(matches!(h.bridge.set_main_gateway("T123"), Err(SunError::Configuration(_))));
    assert_eq!(h.bridge.gateways(), before);

    h.bridge.set_side_gateway(TOKEN).unwrap();
    assert_eq!(h.bridge.gateways().side.to_hex(), TOKEN_HEX);
}

#[tokio::test]
async fn withdraw_poll_reports_revert_on_last_attempt() {
    let h = harness();
    script_send(&h.side);
    for _ in 0..19 {
        h.side.respond(RECEIPT, json!({}));
    }
    h.side.respond(
        RECEIPT,
        json!({"id": TX_ID, "result": "FAILED", "resMessage": "524556455254206f70636f6465206578656375746564"}),
    );

    let err = h
        .bridge
        .withdraw_trx(1_000, 10, 5_000_000, &polling(), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SunError::ExecutionFailed {
            tx_id: TX_ID.into(),
            message: "REVERT opcode executed".into()
        }
    );
    assert_eq!(h.side.requests_to(RECEIPT).len(), 20);
    assert_eq!(h.sleeper.0.load(Ordering::SeqCst), 19);

    let trigger = &h.side.requests_to(TRIGGER)[0].payload;
    assert_eq!(trigger["contract_address"], SIDE_HEX);
    assert_eq!(trigger["function_selector"], "withdrawTRX()");
    assert_eq!(trigger["call_value"], 1_010);
    assert_eq!(trigger["fee_limit"], 5_000_000);
    assert_eq!(h.main.request_count(), 0);
}

#[tokio::test]
async fn withdraw_is_signed_with_side_chain_digest() {
    let h = harness();
    script_send(&h.side);

    h.bridge
        .withdraw_trx(1, 0, 5_000_000, &BridgeCallOptions::default(), None)
        .await
        .unwrap();

    let broadcast = &h.side.requests_to(BROADCAST)[0].payload;
    let signature = hex::decode(broadcast["signature"][0].as_str().unwrap()).unwrap();
    let tx_id = hex::decode(TX_ID).unwrap();
    let chain_id = hex::decode(CHAIN_ID).unwrap();
    let digest = sha256_concat(&[tx_id.as_slice(), chain_id.as_slice()]);
    assert_eq!(recover_address(&digest, &signature).unwrap(), owner_key().address());
}

#[tokio::test]
async fn poll_times_out_after_twenty_empty_receipts() {
    let h = harness();
    script_send(&h.side);
    h.side.respond_always(RECEIPT, json!({}));

    let err = h
        .bridge
        .retry_withdraw(3, 0, 5_000_000, &polling(), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SunError::Timeout {
            attempts: 20,
            tx_id: TX_ID.into()
        }
    );
    assert_eq!(h.sleeper.0.load(Ordering::SeqCst), 19);
}

#[tokio::test]
async fn poll_decodes_single_result() {
    let h = harness();
    script_send(&h.side);
    h.side.respond(RECEIPT, json!({"id": TX_ID, "contractResult": [word("5")]}));

    let outcome = h
        .bridge
        .withdraw_trc20(5, 0, 5_000_000, TOKEN, &polling(), None)
        .await
        .unwrap();
    assert_eq!(outcome, SendOutcome::Confirmed(json!(5)));

    let trigger = &h.side.requests_to(TRIGGER)[0].payload;
    assert_eq!(trigger["function_selector"], "withdrawal(uint256)");
    assert_eq!(trigger["contract_address"], TOKEN_HEX);
}

#[tokio::test]
async fn poll_raw_response_returns_receipt() {
    let h = harness();
    script_send(&h.side);
    let receipt = json!({"id": TX_ID, "contractResult": [""], "blockNumber": 12});
    h.side.respond(RECEIPT, receipt.clone());

    let options = BridgeCallOptions {
        raw_response: true,
        ..polling()
    };
    let outcome = h.bridge.withdraw_trc721(7, 0, 5_000_000, TOKEN, &options, None).await.unwrap();
    assert_eq!(outcome, SendOutcome::Confirmed(receipt));
}

#[tokio::test]
async fn poll_without_contract_result_is_execution_failure() {
    let h = harness();
    script_send(&h.side);
    h.side.respond(RECEIPT, json!({"id": TX_ID, "blockNumber": 12}));

    let err = h
        .bridge
        .withdraw_trx(1, 0, 5_000_000, &polling(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SunError::ExecutionFailed { ref message, .. } if message.starts_with("Failed to execute:")));
}

#[tokio::test]
async fn poll_can_be_cancelled() {
    let main = Arc::new(RecordingTransport::new());
    let side = Arc::new(RecordingTransport::new());
    let cancel = CancellationToken::new();
    let bridge = SidechainBridge::new(LedgerClient::new(main), LedgerClient::new(side.clone()), &config())
        .unwrap()
        .with_sleeper(Arc::new(CancellingSleeper(cancel.clone())));
    bridge.set_private_key(owner_key());
    script_send(&side);
    side.respond_always(RECEIPT, json!({}));

    let options = BridgeCallOptions {
        cancellation: Some(cancel),
        ..polling()
    };
    let err = bridge.withdraw_trx(1, 0, 5_000_000, &options, None).await.unwrap_err();
    assert_eq!(err, SunError::Cancelled);
    assert_eq!(side.requests_to(RECEIPT).len(), 1);
}

#[tokio::test]
async fn trigger_failure_embeds_response() {
    let h = harness();
    h.side.respond(TRIGGER, json!({"result": {"code": "CONTRACT_VALIDATE_ERROR"}}));

    let err = h
        .bridge
        .withdraw_trx(1, 0, 5_000_000, &BridgeCallOptions::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SunError::Remote(ref m) if m.starts_with("Unknown error:") && m.contains("CONTRACT_VALIDATE_ERROR")));
    assert!(h.side.requests_to(BROADCAST).is_empty());
}

#[tokio::test]
async fn broadcast_rejection_carries_code_and_message() {
    let h = harness();
    h.side
        .respond(TRIGGER, json!({"result": {"result": true}, "transaction": transaction_json()}))
        .respond(BROADCAST, json!({"code": "SIGERROR", "message": "5065726d697373696f6e2064656e696564"}));

    let err = h
        .bridge
        .withdraw_trx(1, 0, 5_000_000, &BridgeCallOptions::default(), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SunError::Broadcast {
            code: "SIGERROR".into(),
            message: "Permission denied".into()
        }
    );
}

#[tokio::test]
async fn key_errors_are_distinguished() {
    let main = Arc::new(RecordingTransport::new());
    let side = Arc::new(RecordingTransport::new());
    let bridge = SidechainBridge::new(LedgerClient::new(main), LedgerClient::new(side.clone()), &config()).unwrap();

    let err = bridge
        .withdraw_trx(1, 0, 5_000_000, &BridgeCallOptions::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err, SunError::Signing("No private key available".into()));

    let err = bridge
        .withdraw_trx(1, 0, 5_000_000, &BridgeCallOptions::default(), Some("not a key"))
        .await
        .unwrap_err();
    assert_eq!(err, SunError::Signing("Invalid private key provided".into()));
    assert_eq!(side.request_count(), 0);
}

#[tokio::test]
async fn caller_overrides_win_except_call_value() {
    let h = harness();
    script_send(&h.side);

    let options = BridgeCallOptions {
        fee_limit: Some(20_000_000),
        token_id: Some(1_000_002),
        ..Default::default()
    };
    h.bridge
        .withdraw_trc10(1_000_001, 50, 10, 5_000_000, &options, None)
        .await
        .unwrap();

    let trigger = &h.side.requests_to(TRIGGER)[0].payload;
    assert_eq!(trigger["function_selector"], "withdrawTRC10(uint256,uint256)");
    assert_eq!(trigger["fee_limit"], 20_000_000);
    assert_eq!(trigger["token_id"], 1_000_002);
    assert_eq!(trigger["call_token_value"], 50);
    assert_eq!(trigger["call_value"], 10);
}

#[tokio::test]
async fn inject_fund_signs_and_broadcasts_on_side_chain() {
    let h = harness();
    h.side
        .respond("wallet/fundinject", transaction_json())
        .respond(BROADCAST, json!({"result": true, "txid": TX_ID}));

    let tx_id = h.bridge.inject_fund(1_000, 5_000_000, None).await.unwrap();
    assert_eq!(tx_id, TX_ID);

    let payload = &h.side.requests_to("wallet/fundinject")[0].payload;
    assert_eq!(payload["owner_address"], OWNER_HEX);
    assert_eq!(payload["amount"], 1_000);
    assert_eq!(h.side.requests_to(BROADCAST).len(), 1);
}

#[tokio::test]
async fn validation_failures_send_nothing() {
    let h = harness();
    assert!(h.bridge.retry_deposit(-1, 0, 5_000_000, &BridgeCallOptions::default(), None).await.is_err());
    assert!(h.bridge.deposit_trx(1, 0, 0, &BridgeCallOptions::default(), None).await.is_err());
    assert!(h.bridge.mapping_trc20("xyz", 0, 5_000_000, &BridgeCallOptions::default(), None).await.is_err());
    assert_eq!(h.main.request_count() + h.side.request_count(), 0);
}

#[tokio::test]
async fn call_value_overflow_is_a_validation_error() {
    let h = harness();
    let expected = SunError::Validation("Invalid callValue provided".into());

    let err = h
        .bridge
        .deposit_trx(i64::MAX, 1, 5_000_000, &BridgeCallOptions::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err, expected);

    let err = h
        .bridge
        .withdraw_trx(1, i64::MAX, 5_000_000, &BridgeCallOptions::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err, expected);
    assert_eq!(h.main.request_count() + h.side.request_count(), 0);
}

#[tokio::test]
async fn deposit_trc721_accepts_token_id_zero() {
    let h = harness();
    script_send(&h.main);

    h.bridge
        .deposit_trc721(0, 0, 10_000_000, TOKEN, &BridgeCallOptions::default(), None)
        .await
        .unwrap();

    let triggers = h.main.requests_to(TRIGGER);
    assert_eq!(triggers.len(), 2);
    assert_eq!(triggers[0].payload["function_selector"], "approve(address,uint256)");
    assert_eq!(triggers[1].payload["function_selector"], "depositTRC721(address,uint256)");
    assert_eq!(triggers[1].payload["parameter"], format!("{}{}", word(&TOKEN_HEX[2..]), word("0")));
}

#[tokio::test]
async fn deposit_amount_errors_name_the_field() {
    let h = harness();

    let err = h
        .bridge
        .deposit_trc721(-1, 0, 10_000_000, TOKEN, &BridgeCallOptions::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err, SunError::Validation("Invalid id provided".into()));

    let err = h
        .bridge
        .deposit_trc20(0, 0, 10_000_000, TOKEN, &BridgeCallOptions::default(), None)
        .await
        .unwrap_err();
    assert_eq!(err, SunError::Validation("Invalid num provided".into()));
    assert_eq!(h.main.request_count(), 0);
}

// === Signing ===

fn sign_weight(approved: &[&str], keys: &[&str]) -> Value {
    let mut canonical = transaction_json();
    canonical["raw_data"]["contract"][0]["Permission_id"] = json!(2);
    canonical["txID"] = json!("aa".repeat(32));
    json!({
        "result": {"code": "NOT_ENOUGH_PERMISSION"},
        "approved_list": approved,
        "permission": {
            "keys": keys.iter().map(|k| json!({"address": k, "weight": 1})).collect::<Vec<_>>(),
            "threshold": 2
        },
        "current_weight": 0,
        "transaction": {"transaction": canonical}
    })
}

fn transaction() -> Transaction {
    serde_json::from_value(transaction_json()).unwrap()
}

fn with_permission(id: u32) -> SignOptions {
    SignOptions {
        permission_id: Some(id),
        ..Default::default()
    }
}

#[tokio::test]
async fn multisig_adopts_canonical_transaction() {
    let h = harness();
    h.side.respond(SIGN_WEIGHT, sign_weight(&[], &[OWNER_HEX, TOKEN_HEX]));

    let signed = h
        .bridge
        .sign(Chain::Side, transaction(), None, &with_permission(2))
        .await
        .unwrap();
    assert_eq!(signed.tx_id, "aa".repeat(32));
    assert_eq!(signed.permission_id(), Some(2));
    assert_eq!(signed.signature.len(), 1);

    let request = &h.side.requests_to(SIGN_WEIGHT)[0].payload;
    assert_eq!(request["raw_data"]["contract"][0]["Permission_id"], 2);
}

#[tokio::test]
async fn multisig_rejects_unlisted_and_repeat_signers() {
    let h = harness();
    let owner = owner_key().address().to_base58();

    h.side.respond(SIGN_WEIGHT, sign_weight(&[], &[TOKEN_HEX]));
    let err = h.bridge.sign(Chain::Side, transaction(), None, &with_permission(2)).await.unwrap_err();
    assert_eq!(err, SunError::Permission(format!("{} has no permission to sign", owner)));

    h.side.respond(SIGN_WEIGHT, sign_weight(&[OWNER_HEX], &[OWNER_HEX, TOKEN_HEX]));
    let err = h.bridge.sign(Chain::Side, transaction(), None, &with_permission(2)).await.unwrap_err();
    assert_eq!(err, SunError::Permission(format!("{} already signed transaction", owner)));

    h.side.respond(
        SIGN_WEIGHT,
        json!({"result": {"code": "PERMISSION_ERROR", "message": "5065726d697373696f6e2064656e696564"}}),
    );
    let err = h.bridge.sign(Chain::Side, transaction(), None, &with_permission(2)).await.unwrap_err();
    assert_eq!(err, SunError::Permission("Permission denied".into()));
}

#[tokio::test]
async fn plain_sign_checks_owner_and_is_idempotent() {
    let h = harness();
    let stranger = PrivateKey::from_hex(&format!("{:064x}", 2)).unwrap();
    let stranger_hex = stranger.to_hex();

    let err = h
        .bridge
        .sign(Chain::Side, transaction(), Some(stranger_hex.as_str()), &SignOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, SunError::Signing("Private key does not match address in transaction".into()));

    let bypass = SignOptions {
        skip_owner_check: true,
        ..Default::default()
    };
    let signed = h
        .bridge
        .sign(Chain::Side, transaction(), Some(stranger_hex.as_str()), &bypass)
        .await
        .unwrap();
    assert_eq!(signed.signature.len(), 1);

    let mut tx = transaction();
    assert!(h.bridge.sign_transaction(&mut tx, None).unwrap());
    assert!(!h.bridge.sign_transaction(&mut tx, None).unwrap());
    assert_eq!(tx.signature.len(), 1);
    assert_eq!(h.side.request_count(), 0);
}
