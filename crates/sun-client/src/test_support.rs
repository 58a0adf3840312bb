//! Fixtures shared by unit tests

use serde_json::{json, Value};
use sun_core::Transaction;

pub const CONTRACT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
pub const CONTRACT_HEX: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

/// Address of the private key `0x…01`
pub const OWNER: &str = "TMVQGm1qAQYVdetCeGRRkTWYYrLXuHK2HC";
pub const OWNER_HEX: &str = "417e5f4552091a69125d5dfcb7b8c2659029395bdf";

pub fn transaction_json(owner_hex: &str) -> Value {
    json!({
        "visible": false,
        "txID": "7b1c4f3e2d6a5b8c9d0e1f2a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d6e",
        "raw_data": {
            "contract": [{
                "parameter": {
                    "value": {"owner_address": owner_hex, "to_address": CONTRACT_HEX, "amount": 10},
                    "type_url": "type.googleapis.com/protocol.TransferContract"
                },
                "type": "TransferContract"
            }],
            "ref_block_bytes": "0a1b",
            "ref_block_hash": "3c4d5e6f708192a3",
            "expiration": 4_102_444_800_000i64,
            "timestamp": 4_102_444_740_000i64
        },
        "raw_data_hex": "0a020a1b"
    })
}

pub fn transaction(owner_hex: &str) -> Transaction {
    serde_json::from_value(transaction_json(owner_hex)).expect("fixture transaction")
}

pub fn owner_key() -> sun_crypto::PrivateKey {
    sun_crypto::PrivateKey::from_hex(&format!("{:064x}", 1)).expect("fixture key")
}

/// Client whose default identity is [`owner_key`], over a recording transport
pub fn recording_client() -> (
    std::sync::Arc<crate::transport::RecordingTransport>,
    crate::client::LedgerClient,
) {
    let transport = std::sync::Arc::new(crate::transport::RecordingTransport::new());
    let client = crate::client::LedgerClient::builder(transport.clone())
        .private_key(owner_key())
        .build();
    (transport, client)
}

/// Payload of the only request sent to `path`
pub fn sole_payload(transport: &crate::transport::RecordingTransport, path: &str) -> Value {
    let requests = transport.requests_to(path);
    assert_eq!(requests.len(), 1, "expected exactly one request to {}", path);
    requests[0].payload.clone()
}
