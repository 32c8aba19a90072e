use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key part of a structured record id. The backend emits either a bare string or a
/// `{ "String": "..." }` wrapper for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThingKey {
    Plain(String),
    Wrapped {
        #[serde(rename = "String")]
        string: String,
    },
}

impl ThingKey {
    pub fn as_str(&self) -> &str {
        match self {
            ThingKey::Plain(key) => key,
            ThingKey::Wrapped { string } => string,
        }
    }
}

/// A foreign-key value as it arrives over the wire.
///
/// Every shape the backend has been observed to send is accepted; anything else is
/// kept as `Unrecognized` so one odd reference never fails a whole collection decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RecordId {
    /// `"table:key"`, or occasionally a bare key.
    Raw(String),
    /// `{ "tb": "table", "id": ... }`
    Thing { tb: String, id: ThingKey },
    #[default]
    Missing,
    Unrecognized(Value),
}

impl RecordId {
    pub fn thing(tb: impl Into<String>, id: impl Into<String>) -> Self {
        RecordId::Thing {
            tb: tb.into(),
            id: ThingKey::Plain(id.into()),
        }
    }

    /// Decode an arbitrary JSON value, never failing.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(RecordId::Missing)
    }

    pub fn canonical(&self) -> String {
        normalize(self)
    }

    pub fn is_missing(&self) -> bool {
        normalize(self).is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&normalize(self))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Raw(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::Raw(value)
    }
}

impl From<&RecordId> for RecordId {
    fn from(value: &RecordId) -> Self {
        value.clone()
    }
}

/// Canonical string form of an identifier. Unknown shapes and absent values map to "".
pub fn normalize(value: &RecordId) -> String {
    match value {
        RecordId::Raw(raw) => raw.clone(),
        RecordId::Thing { tb, id } => format!("{tb}:{}", id.as_str()),
        RecordId::Missing | RecordId::Unrecognized(_) => String::new(),
    }
}

/// Normalizes a JSON value directly, for callers holding undecoded payloads.
pub fn normalize_value(value: &Value) -> String {
    normalize(&RecordId::from_value(value))
}

/// Identity comparison tolerant of one side missing the table prefix.
///
/// Both sides are normalized and stripped of a leading `prefix`; the pair matches when
/// the stripped forms agree or the raw canonical forms agree. Empty identifiers never
/// match anything, including each other.
pub fn equals_ignoring_prefix(a: &RecordId, b: &RecordId, prefix: &str) -> bool {
    let raw_a = normalize(a);
    let raw_b = normalize(b);
    if raw_a.is_empty() || raw_b.is_empty() {
        return false;
    }
    let stripped_a = raw_a.strip_prefix(prefix).unwrap_or(&raw_a);
    let stripped_b = raw_b.strip_prefix(prefix).unwrap_or(&raw_b);
    if !stripped_a.is_empty() && stripped_a == stripped_b {
        return true;
    }
    raw_a == raw_b
}

/// The bare record key used to address a record in API calls: the part after the
/// table separator, without the `⟨ ⟩` quoting the backend applies to complex keys.
pub fn record_key(value: &RecordId) -> String {
    let canonical = normalize(value);
    let key = match canonical.split_once(':') {
        Some((_, key)) => key,
        None => canonical.as_str(),
    };
    key.trim_start_matches('⟨')
        .trim_end_matches('⟩')
        .to_string()
}

fn key_in_table<'a>(canonical: &'a str, prefix: &str) -> &'a str {
    canonical
        .strip_prefix(prefix)
        .unwrap_or(canonical)
        .trim_start_matches('⟨')
        .trim_end_matches('⟩')
}

/// Whether `a` and `b` address the same record of the table named by `prefix`.
///
/// Extends [`equals_ignoring_prefix`] with the `⟨ ⟩` quoting, so an id matches the
/// key [`record_key`] sends to the backend for it.
pub fn same_record(a: &RecordId, b: &RecordId, prefix: &str) -> bool {
    if equals_ignoring_prefix(a, b, prefix) {
        return true;
    }
    let raw_a = normalize(a);
    let raw_b = normalize(b);
    let key_a = key_in_table(&raw_a, prefix);
    !key_a.is_empty() && key_a == key_in_table(&raw_b, prefix)
}
