//! Contract ABI metadata and parameter codec
//!
//! The codec implements the standard head/tail layout for the primitive,
//! array and tuple types contracts on the ledger use. Addresses are
//! accepted in any ledger form and decoded to canonical ledger hex.

use std::fmt;

use alloy_primitives::{I256, U256};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sun_core::{Address, Result, SunError};

const WORD: usize = 32;

// ============================================================================
// ABI metadata
// ============================================================================

/// One parameter of a function, constructor or event
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub param_type: String,

    /// Members of a tuple type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl AbiParam {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            ..Default::default()
        }
    }

    /// Type string with tuples expanded, e.g. `(address,uint256)[]`
    pub fn canonical_type(&self) -> String {
        match self.param_type.strip_prefix("tuple") {
            Some(suffix) => {
                let inner: Vec<String> = self.components.iter().map(|c| c.canonical_type()).collect();
                format!("({}){}", inner.join(","), suffix)
            }
            None => self.param_type.clone(),
        }
    }
}

/// One ABI entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiEntry {
    /// `function`, `constructor`, `event`, `fallback`; nodes capitalize it
    #[serde(rename = "type", default)]
    pub entry_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub inputs: Vec<AbiParam>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<AbiParam>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
}

impl AbiEntry {
    pub fn function(name: impl Into<String>, inputs: Vec<AbiParam>, outputs: Vec<AbiParam>) -> Self {
        Self {
            entry_type: "function".into(),
            name: Some(name.into()),
            inputs,
            outputs,
            ..Default::default()
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.entry_type.eq_ignore_ascii_case("constructor")
    }

    pub fn is_function(&self) -> bool {
        self.entry_type.eq_ignore_ascii_case("function")
    }

    pub fn is_payable(&self) -> bool {
        self.payable.unwrap_or(false)
            || self
                .state_mutability
                .as_deref()
                .map_or(false, |m| m.eq_ignore_ascii_case("payable"))
    }

    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(|p| p.canonical_type()).collect();
        format!("{}({})", self.name.as_deref().unwrap_or_default(), inputs.join(","))
    }

    pub fn input_types(&self) -> Vec<String> {
        self.inputs.iter().map(|p| p.canonical_type()).collect()
    }

    pub fn output_types(&self) -> Vec<String> {
        self.outputs.iter().map(|p| p.canonical_type()).collect()
    }
}

/// Contract ABI as returned by `wallet/getcontract` or supplied by a caller
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContractAbi {
    pub entries: Vec<AbiEntry>,
}

impl ContractAbi {
    pub fn new(entries: Vec<AbiEntry>) -> Self {
        Self { entries }
    }

    pub fn constructor(&self) -> Option<&AbiEntry> {
        self.entries.iter().find(|e| e.is_constructor())
    }

    /// Find a function by canonical signature; whitespace in `signature` is ignored
    pub fn function(&self, signature: &str) -> Option<&AbiEntry> {
        let wanted: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
        self.entries
            .iter()
            .filter(|e| e.is_function())
            .find(|e| e.signature() == wanted)
    }
}

impl<'de> Deserialize<'de> for ContractAbi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Entries(Vec<AbiEntry>),
            Wrapped {
                #[serde(default)]
                entrys: Vec<AbiEntry>,
            },
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Entries(entries) => Self { entries },
            Shape::Wrapped { entrys } => Self { entries: entrys },
        })
    }
}

// ============================================================================
// Parameter types
// ============================================================================

/// Parsed ABI type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bool,
    Uint(usize),
    Int(usize),
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
    Tuple(Vec<ParamType>),
}

impl ParamType {
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let unsupported = || SunError::Encoding(format!("Unsupported parameter type: {}", input));

        if s.is_empty() {
            return Err(SunError::Encoding(format!("Invalid parameter type provided: {}", input)));
        }

        if let Some(body) = s.strip_suffix(']') {
            let open = body.rfind('[').ok_or_else(unsupported)?;
            let inner = Self::parse(&body[..open])?;
            let size = &body[open + 1..];
            return if size.is_empty() {
                Ok(Self::Array(Box::new(inner)))
            } else {
                let n = size.parse::<usize>().map_err(|_| unsupported())?;
                Ok(Self::FixedArray(Box::new(inner), n))
            };
        }

        if let Some(body) = s.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
            let members = split_top_level(body)
                .into_iter()
                .map(Self::parse)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::Tuple(members));
        }

        let sized = |prefix: &str| -> Option<Result<usize>> {
            let digits = s.strip_prefix(prefix)?;
            if digits.is_empty() {
                return Some(Ok(256));
            }
            Some(
                digits
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0 && *n <= 256 && n % 8 == 0)
                    .ok_or_else(unsupported),
            )
        };

        match s {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            "bytes" => Ok(Self::Bytes),
            "trcToken" => Ok(Self::Uint(256)),
            _ => {
                if let Some(bits) = sized("uint") {
                    return bits.map(Self::Uint);
                }
                if let Some(bits) = sized("int") {
                    return bits.map(Self::Int);
                }
                if let Some(digits) = s.strip_prefix("bytes") {
                    return digits
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0 && *n <= 32)
                        .map(Self::FixedBytes)
                        .ok_or_else(unsupported);
                }
                Err(unsupported())
            }
        }
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Bytes | Self::String | Self::Array(_) => true,
            Self::FixedArray(inner, _) => inner.is_dynamic(),
            Self::Tuple(members) => members.iter().any(|m| m.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head section
    fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            Self::FixedArray(inner, n) => inner.head_size() * n,
            Self::Tuple(members) => members.iter().map(|m| m.head_size()).sum(),
            _ => WORD,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::Uint(bits) => write!(f, "uint{}", bits),
            Self::Int(bits) => write!(f, "int{}", bits),
            Self::FixedBytes(n) => write!(f, "bytes{}", n),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
            Self::Array(inner) => write!(f, "{}[]", inner),
            Self::FixedArray(inner, n) => write!(f, "{}[{}]", inner, n),
            Self::Tuple(members) => {
                let inner: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "({})", inner.join(","))
            }
        }
    }
}

fn split_top_level(body: &str) -> Vec<&str> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

// ============================================================================
// Codec
// ============================================================================

/// Parameter codec used by the contract pipeline
pub trait AbiCodec: Send + Sync {
    /// Encode `values` as the parameter block for `types`
    fn encode(&self, types: &[String], values: &[Value]) -> Result<Vec<u8>>;

    /// Decode a parameter or return-data block
    fn decode(&self, types: &[String], data: &[u8]) -> Result<Vec<Value>>;

    /// Encode against a full function descriptor; tuple values may be
    /// objects keyed by component name
    fn encode_v2(&self, function: &AbiEntry, values: &[Value]) -> Result<Vec<u8>>;
}

/// Default head/tail codec
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardAbiCodec;

impl AbiCodec for StandardAbiCodec {
    fn encode(&self, types: &[String], values: &[Value]) -> Result<Vec<u8>> {
        if types.len() != values.len() {
            return Err(SunError::Encoding(format!(
                "Expected {} values, got {}",
                types.len(),
                values.len()
            )));
        }
        let parsed = types
            .iter()
            .map(|t| ParamType::parse(t))
            .collect::<Result<Vec<_>>>()?;
        encode_tokens(&parsed, values)
    }

    fn decode(&self, types: &[String], data: &[u8]) -> Result<Vec<Value>> {
        let parsed = types
            .iter()
            .map(|t| ParamType::parse(t))
            .collect::<Result<Vec<_>>>()?;
        decode_tokens(&parsed, data, 0)
    }

    fn encode_v2(&self, function: &AbiEntry, values: &[Value]) -> Result<Vec<u8>> {
        if function.inputs.len() != values.len() {
            return Err(SunError::Encoding(format!(
                "{} expects {} values, got {}",
                function.signature(),
                function.inputs.len(),
                values.len()
            )));
        }
        let normalized: Vec<Value> = function
            .inputs
            .iter()
            .zip(values)
            .map(|(param, value)| tuple_objects_to_arrays(param, value))
            .collect();
        self.encode(&function.input_types(), &normalized)
    }
}

/// Rewrite tuple values given as objects into positional arrays
fn tuple_objects_to_arrays(param: &AbiParam, value: &Value) -> Value {
    let Some(suffix) = param.param_type.strip_prefix("tuple") else {
        return value.clone();
    };
    if !suffix.is_empty() {
        // tuple array: strip one dimension and recurse into each element
        let element = AbiParam {
            param_type: format!("tuple{}", &suffix[..suffix.rfind('[').unwrap_or(0)]),
            ..param.clone()
        };
        return match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| tuple_objects_to_arrays(&element, item))
                    .collect(),
            ),
            other => other.clone(),
        };
    }
    match value {
        Value::Object(map) => Value::Array(
            param
                .components
                .iter()
                .map(|c| {
                    let member = map.get(&c.name).cloned().unwrap_or(Value::Null);
                    tuple_objects_to_arrays(c, &member)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            param
                .components
                .iter()
                .zip(items)
                .map(|(c, item)| tuple_objects_to_arrays(c, item))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn mismatch(ty: &ParamType, value: &Value) -> SunError {
    SunError::Encoding(format!("Invalid value for type {}: {}", ty, value))
}

fn word_from_usize(n: usize) -> [u8; WORD] {
    U256::from(n).to_be_bytes::<WORD>()
}

fn pad_right(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
    out
}

fn parse_uint(value: &Value) -> Option<U256> {
    match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => U256::from_str_radix(hex, 16).ok(),
                None => U256::from_str_radix(s, 10).ok(),
            }
        }
        _ => None,
    }
}

fn parse_int(value: &Value) -> Option<I256> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => I256::from_dec_str(&n.to_string()).ok(),
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with("0x") || s.starts_with("-0x") {
                I256::from_hex_str(s).ok()
            } else {
                I256::from_dec_str(s).ok()
            }
        }
        _ => None,
    }
}

fn hex_bytes(value: &Value) -> Option<Vec<u8>> {
    let s = value.as_str()?;
    hex::decode(sun_core::strip_0x(s)).ok()
}

fn encode_tokens(types: &[ParamType], values: &[Value]) -> Result<Vec<u8>> {
    let head_size: usize = types.iter().map(|t| t.head_size()).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (ty, value) in types.iter().zip(values) {
        let encoded = encode_value(ty, value)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&word_from_usize(head_size + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }
    head.extend(tail);
    Ok(head)
}

fn encode_sequence(ty: &ParamType, inner: &ParamType, value: &Value, expected: Option<usize>) -> Result<Vec<u8>> {
    let items = value.as_array().ok_or_else(|| mismatch(ty, value))?;
    if let Some(n) = expected {
        if items.len() != n {
            return Err(mismatch(ty, value));
        }
    }
    let types = vec![inner.clone(); items.len()];
    let body = encode_tokens(&types, items)?;
    Ok(match expected {
        Some(_) => body,
        None => {
            let mut out = word_from_usize(items.len()).to_vec();
            out.extend(body);
            out
        }
    })
}

fn encode_value(ty: &ParamType, value: &Value) -> Result<Vec<u8>> {
    match ty {
        ParamType::Address => {
            let address = value
                .as_str()
                .and_then(|s| Address::parse(s).ok())
                .ok_or_else(|| mismatch(ty, value))?;
            let mut word = vec![0u8; 12];
            word.extend_from_slice(&address.account_hash());
            Ok(word)
        }
        ParamType::Bool => {
            let b = value.as_bool().ok_or_else(|| mismatch(ty, value))?;
            Ok(word_from_usize(b as usize).to_vec())
        }
        ParamType::Uint(bits) => {
            let n = parse_uint(value).ok_or_else(|| mismatch(ty, value))?;
            if n.bit_len() > *bits {
                return Err(mismatch(ty, value));
            }
            Ok(n.to_be_bytes::<WORD>().to_vec())
        }
        ParamType::Int(bits) => {
            let n = parse_int(value).ok_or_else(|| mismatch(ty, value))?;
            if *bits < 256 {
                let bound = U256::from(1u8) << (bits - 1);
                let abs = n.unsigned_abs();
                let fits = if n.is_negative() { abs <= bound } else { abs < bound };
                if !fits {
                    return Err(mismatch(ty, value));
                }
            }
            Ok(n.into_raw().to_be_bytes::<WORD>().to_vec())
        }
        ParamType::FixedBytes(size) => {
            let bytes = hex_bytes(value).ok_or_else(|| mismatch(ty, value))?;
            if bytes.len() > *size {
                return Err(mismatch(ty, value));
            }
            let mut word = bytes;
            word.resize(WORD, 0);
            Ok(word)
        }
        ParamType::Bytes | ParamType::String => {
            let bytes = if *ty == ParamType::Bytes {
                hex_bytes(value).ok_or_else(|| mismatch(ty, value))?
            } else {
                value
                    .as_str()
                    .ok_or_else(|| mismatch(ty, value))?
                    .as_bytes()
                    .to_vec()
            };
            let mut out = word_from_usize(bytes.len()).to_vec();
            out.extend(pad_right(&bytes));
            Ok(out)
        }
        ParamType::Array(inner) => encode_sequence(ty, inner, value, None),
        ParamType::FixedArray(inner, n) => encode_sequence(ty, inner, value, Some(*n)),
        ParamType::Tuple(members) => {
            let items = value.as_array().ok_or_else(|| mismatch(ty, value))?;
            if items.len() != members.len() {
                return Err(mismatch(ty, value));
            }
            encode_tokens(members, items)
        }
    }
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8]> {
    data.get(at..at + WORD)
        .ok_or_else(|| SunError::Encoding(format!("Data too short to read word at {}", at)))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize> {
    let n = U256::from_be_slice(read_word(data, at)?);
    if n > U256::from(u32::MAX) {
        return Err(SunError::Encoding("Offset out of range".into()));
    }
    Ok(n.as_limbs()[0] as usize)
}

/// Every element takes at least one head word after `at`
fn ensure_room(data: &[u8], at: usize, elements: usize) -> Result<()> {
    let available = data.len().saturating_sub(at);
    match elements.checked_mul(WORD) {
        Some(needed) if needed <= available => Ok(()),
        _ => Err(SunError::Encoding(format!(
            "Array of {} elements does not fit in the data",
            elements
        ))),
    }
}

fn number_value(text: String) -> Value {
    match text.parse::<i64>() {
        Ok(n) => Value::from(n),
        Err(_) => match text.parse::<u64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(text),
        },
    }
}

fn decode_tokens(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Value>> {
    let mut out = Vec::with_capacity(types.len());
    let mut offset = base;
    for ty in types {
        if ty.is_dynamic() {
            let pointer = read_usize(data, offset)?;
            out.push(decode_value(ty, data, base + pointer)?);
        } else {
            out.push(decode_value(ty, data, offset)?);
        }
        offset += ty.head_size();
    }
    Ok(out)
}

fn decode_value(ty: &ParamType, data: &[u8], at: usize) -> Result<Value> {
    match ty {
        ParamType::Address => {
            let word = read_word(data, at)?;
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&word[12..]);
            Ok(Value::String(Address::from_account_hash(hash).to_hex()))
        }
        ParamType::Bool => Ok(Value::Bool(read_word(data, at)?.iter().any(|b| *b != 0))),
        ParamType::Uint(_) => Ok(number_value(U256::from_be_slice(read_word(data, at)?).to_string())),
        ParamType::Int(_) => {
            let raw = U256::from_be_slice(read_word(data, at)?);
            Ok(number_value(I256::from_raw(raw).to_string()))
        }
        ParamType::FixedBytes(size) => {
            let word = read_word(data, at)?;
            Ok(Value::String(format!("0x{}", hex::encode(&word[..*size]))))
        }
        ParamType::Bytes | ParamType::String => {
            let len = read_usize(data, at)?;
            let start = at + WORD;
            let bytes = data
                .get(start..start + len)
                .ok_or_else(|| SunError::Encoding("Data too short for dynamic value".into()))?;
            if *ty == ParamType::Bytes {
                Ok(Value::String(format!("0x{}", hex::encode(bytes))))
            } else {
                String::from_utf8(bytes.to_vec())
                    .map(Value::String)
                    .map_err(|_| SunError::Encoding("String value is not valid utf8".into()))
            }
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            ensure_room(data, at + WORD, len)?;
            let types = vec![(**inner).clone(); len];
            decode_tokens(&types, data, at + WORD).map(Value::Array)
        }
        ParamType::FixedArray(inner, n) => {
            ensure_room(data, at, *n)?;
            let types = vec![(**inner).clone(); *n];
            decode_tokens(&types, data, at).map(Value::Array)
        }
        ParamType::Tuple(members) => decode_tokens(members, data, at).map(Value::Array),
    }
}
