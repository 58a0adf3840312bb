//! Declarative parameter validation
//!
//! Every builder operation describes its arguments as a list of [`Rule`]s
//! and runs them through [`ParameterValidator`] before touching the
//! network. Rules are evaluated in order and evaluation stops at the first
//! failure, whose message becomes the error verbatim.
//!
//! ```ignore
//! let normalized = ParameterValidator::validate(vec![
//!     Rule::address("recipient", to),
//!     Rule::address("origin", from),
//!     Rule::not_equal("recipient", "origin").msg("Cannot transfer TRX to the same account"),
//!     Rule::integer("amount", amount).gt(0),
//! ])?;
//! ```

use std::collections::HashMap;

use serde_json::Value;
use sun_core::{Address, Result, ResourceType, SunError};
use url::Url;

/// Kind of check a rule performs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    Address,
    Integer,
    PositiveInteger,
    TokenId,
    NotEmptyObject,
    NotEqual,
    Resource,
    Url,
    Hex,
    Array,
    NotEmptyString,
    Boolean,
    String,
}

/// One validation rule
#[derive(Clone, Debug)]
pub struct Rule {
    name: String,
    other: Option<String>,
    kind: RuleKind,
    value: Value,
    gt: Option<i128>,
    lt: Option<i128>,
    gte: Option<i128>,
    lte: Option<i128>,
    optional: bool,
    msg: Option<String>,
}

impl Rule {
    /// Rule of `kind` over `value`; `Value::Null` means the argument was absent
    pub fn new(name: impl Into<String>, kind: RuleKind, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            other: None,
            kind,
            value: value.into(),
            gt: None,
            lt: None,
            gte: None,
            lte: None,
            optional: false,
            msg: None,
        }
    }

    pub fn address(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::Address, value)
    }

    pub fn integer(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::Integer, value)
    }

    pub fn positive_integer(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::PositiveInteger, value)
    }

    pub fn token_id(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::TokenId, value)
    }

    pub fn not_empty_object(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::NotEmptyObject, value)
    }

    /// Fails when the two named, already-validated fields normalize to the same value
    pub fn not_equal(first: impl Into<String>, second: impl Into<String>) -> Self {
        let mut rule = Self::new(first, RuleKind::NotEqual, Value::Null);
        rule.other = Some(second.into());
        rule
    }

    pub fn resource(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::Resource, value)
    }

    pub fn url(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::Url, value)
    }

    pub fn hex(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::Hex, value)
    }

    pub fn array(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::Array, value)
    }

    pub fn not_empty_string(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::NotEmptyString, value)
    }

    pub fn boolean(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::Boolean, value)
    }

    pub fn string(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, RuleKind::String, value)
    }

    pub fn gt(mut self, bound: impl Into<i128>) -> Self {
        self.gt = Some(bound.into());
        self
    }

    pub fn lt(mut self, bound: impl Into<i128>) -> Self {
        self.lt = Some(bound.into());
        self
    }

    pub fn gte(mut self, bound: impl Into<i128>) -> Self {
        self.gte = Some(bound.into());
        self
    }

    pub fn lte(mut self, bound: impl Into<i128>) -> Self {
        self.lte = Some(bound.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Replace the generic failure message
    pub fn msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    fn skipped(&self) -> bool {
        if !self.optional || self.kind == RuleKind::PositiveInteger {
            return false;
        }
        match &self.value {
            Value::Null => true,
            Value::Bool(false) => self.kind != RuleKind::Boolean,
            _ => false,
        }
    }

    fn failure_message(&self) -> String {
        if let Some(msg) = &self.msg {
            return msg.clone();
        }
        match self.kind {
            RuleKind::Address => format!("Invalid {} address provided", self.name),
            RuleKind::PositiveInteger => format!("{} must be a positive integer", self.name),
            _ => format!("Invalid {} provided", self.name),
        }
    }

    fn within_bounds(&self, n: i128) -> bool {
        self.gt.map_or(true, |b| n > b)
            && self.lt.map_or(true, |b| n < b)
            && self.gte.map_or(true, |b| n >= b)
            && self.lte.map_or(true, |b| n <= b)
    }
}

/// Integer view of a JSON value; floats and numeric strings are not integers
pub(crate) fn as_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        _ => None,
    }
}

fn is_valid_url(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Values that passed validation, keyed by rule name
///
/// Address fields hold canonical hex.
#[derive(Clone, Debug, Default)]
pub struct Normalized {
    values: HashMap<String, Value>,
}

impl Normalized {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Canonical hex of a validated address field
    pub fn address(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Canonical hex of a validated address field, for fields known to be required
    pub fn require_address(&self, name: &str) -> Result<String> {
        self.address(name)
            .map(str::to_string)
            .ok_or_else(|| SunError::Validation(format!("Invalid {} address provided", name)))
    }
}

/// Rule evaluator
#[derive(Debug, Default)]
pub struct ParameterValidator {
    normalized: Normalized,
}

impl ParameterValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `rules` in order.
    ///
    /// On the first failing rule, `on_invalid` is called once with its
    /// message and `true` is returned. Otherwise returns `false` and the
    /// normalized values are available through [`ParameterValidator::normalized`].
    pub fn not_valid<F>(&mut self, rules: Vec<Rule>, on_invalid: F) -> bool
    where
        F: FnOnce(String),
    {
        self.normalized = Normalized::default();

        for rule in rules {
            if rule.skipped() {
                continue;
            }
            if !self.check(&rule) {
                let message = rule.failure_message();
                tracing::debug!(rule = %rule.name, kind = ?rule.kind, "validation failed: {}", message);
                on_invalid(message);
                return true;
            }
        }
        false
    }

    /// `?`-friendly form of [`ParameterValidator::not_valid`]
    pub fn validate(rules: Vec<Rule>) -> Result<Normalized> {
        let mut validator = Self::new();
        let mut failure = None;
        if validator.not_valid(rules, |msg| failure = Some(msg)) {
            return Err(SunError::Validation(failure.unwrap_or_default()));
        }
        Ok(validator.normalized)
    }

    pub fn normalized(&self) -> &Normalized {
        &self.normalized
    }

    fn check(&mut self, rule: &Rule) -> bool {
        let value = &rule.value;
        let passed = match rule.kind {
            RuleKind::Address => {
                let canonical = value
                    .as_str()
                    .and_then(|s| Address::parse(s).ok())
                    .map(|a| a.to_hex());
                match canonical {
                    Some(hex) => {
                        self.normalized
                            .values
                            .insert(rule.name.clone(), Value::String(hex));
                        return true;
                    }
                    None => false,
                }
            }
            RuleKind::Integer => as_integer(value).map_or(false, |n| rule.within_bounds(n)),
            RuleKind::PositiveInteger => as_integer(value).map_or(false, |n| n > 0),
            RuleKind::TokenId | RuleKind::NotEmptyString => {
                value.as_str().map_or(false, |s| !s.is_empty())
            }
            RuleKind::NotEmptyObject => value.as_object().map_or(false, |o| !o.is_empty()),
            RuleKind::NotEqual => {
                let other = rule.other.as_deref().unwrap_or_default();
                let first = self.normalized.values.get(&rule.name);
                let second = self.normalized.values.get(other);
                return first != second;
            }
            RuleKind::Resource => value
                .as_str()
                .map_or(false, |s| ResourceType::parse(s).is_some()),
            RuleKind::Url => value.as_str().map_or(false, is_valid_url),
            RuleKind::Hex => value.as_str().map_or(false, sun_core::is_hex),
            RuleKind::Array => value.is_array(),
            RuleKind::Boolean => value.is_boolean(),
            RuleKind::String => value
                .as_str()
                .map_or(false, |s| rule.within_bounds(s.chars().count() as i128)),
        };

        if passed {
            self.normalized
                .values
                .insert(rule.name.clone(), value.clone());
        }
        passed
    }
}
