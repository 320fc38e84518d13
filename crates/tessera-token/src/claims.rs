//! Token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Principal identifier claim.
pub const PRINCIPAL_ID_CLAIM: &str = "eid";

/// Expiration claim, in seconds since the Unix epoch.
pub const EXPIRATION_CLAIM: &str = "exp";

/// Special (ephemeral) group identifiers claim.
pub const SPECIAL_GROUPS_CLAIM: &str = "sg";

/// A single claim value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimValue {
    Text(String),
    List(Vec<String>),
    Timestamp(DateTime<Utc>),
}

impl ClaimValue {
    fn to_json(&self) -> Value {
        match self {
            ClaimValue::Text(s) => Value::String(s.clone()),
            ClaimValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            ClaimValue::Timestamp(at) => Value::from(at.timestamp()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ClaimValue::Text(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(ClaimValue::Timestamp),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(ClaimValue::List),
            _ => None,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        ClaimValue::Text(s.to_string())
    }
}

/// Ordered claim mapping carried inside a signed envelope.
///
/// Insertion order is preserved on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet {
    claims: Map<String, Value>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim, returning the value it replaced (last writer wins).
    pub fn insert(&mut self, key: impl Into<String>, value: ClaimValue) -> Option<ClaimValue> {
        self.claims
            .insert(key.into(), value.to_json())
            .and_then(|old| ClaimValue::from_json(&old))
    }

    /// Typed view of a claim. `None` if absent or not representable.
    pub fn get(&self, key: &str) -> Option<ClaimValue> {
        self.claims.get(key).and_then(ClaimValue::from_json)
    }

    /// Raw JSON of a claim, for providers that validate shape themselves.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// String claim.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.claims.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.claims.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.claims.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// The principal identifier claim.
    pub fn principal_id(&self) -> Option<&str> {
        self.text(PRINCIPAL_ID_CLAIM)
    }

    /// The expiration claim.
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self.get(EXPIRATION_CLAIM)? {
            ClaimValue::Timestamp(at) => Some(at),
            _ => None,
        }
    }

    pub fn set_expiration(&mut self, at: DateTime<Utc>) {
        self.insert(EXPIRATION_CLAIM, ClaimValue::Timestamp(at));
    }

    /// Compare claims, ignoring expiration.
    ///
    /// Two tokens issued to the same principal within one window carry the
    /// same claims and differ only in expiration.
    pub fn same_claims_as(&self, other: &ClaimSet) -> bool {
        let strip = |set: &ClaimSet| {
            let mut claims = set.claims.clone();
            claims.remove(EXPIRATION_CLAIM);
            claims
        };
        strip(self) == strip(other)
    }
}
