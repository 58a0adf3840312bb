//! Hex and utf8 helpers for ledger-native text fields

/// Drop a leading `0x`/`0X`
pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// True for a non-empty hex string, `0x` optional
pub fn is_hex(s: &str) -> bool {
    let body = strip_0x(s);
    !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit())
}

/// Hex of the utf8 bytes of `s`
pub fn utf8_to_hex(s: &str) -> String {
    hex::encode(s.as_bytes())
}

/// Decode hex to utf8; `None` if not hex or not valid utf8
pub fn hex_to_utf8(s: &str) -> Option<String> {
    let bytes = hex::decode(strip_0x(s)).ok()?;
    String::from_utf8(bytes).ok()
}

/// Node messages are usually hex encoded text; fall back to the raw value
pub fn decode_node_message(s: &str) -> String {
    hex_to_utf8(s).unwrap_or_else(|| s.to_string())
}
