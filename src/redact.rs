//! Recursive redaction of sensitive keys in JSON-shaped values.

use crate::error::ConfigError;
use crate::formatter::OutputFilter;
use serde_json::{Map, Value};

/// Replacement written in place of a redacted value.
pub const REDACTED: &str = "REDACTED";

/// Keys redacted when no explicit list is configured.
pub const DEFAULT_REDACT_KEYS: &[&str] = &[
    "password",
    "access_token",
    "refresh_token",
    "token",
    "set-cookie",
    "cookie",
    "authorization",
    "x-api-key",
];

/// Denylist of map keys whose values must never be written out.
///
/// Matching is exact string equality against map keys, optionally after
/// Unicode lowercasing both sides. Lowercasing is not full case folding:
/// `"ß"` does not match `"ss"`. Values and list elements are never matched
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionPolicy {
    keys: Vec<String>,
    case_insensitive: bool,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self {
            keys: DEFAULT_REDACT_KEYS.iter().map(|k| k.to_string()).collect(),
            case_insensitive: true,
        }
    }
}

impl RedactionPolicy {
    /// Build a policy from `keys`, dropping duplicates but keeping the order
    /// of first appearance. In case-insensitive mode keys are stored folded.
    pub fn new<I, S>(keys: I, case_insensitive: bool) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut folded: Vec<String> = Vec::new();
        for key in keys {
            let key: String = key.into();
            if key.is_empty() {
                return Err(ConfigError::EmptyRedactKey);
            }
            let key = if case_insensitive { fold(&key) } else { key };
            if !folded.contains(&key) {
                folded.push(key);
            }
        }
        Ok(Self {
            keys: folded,
            case_insensitive,
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn matches(&self, key: &str) -> bool {
        if self.case_insensitive {
            let key = fold(key);
            self.keys.iter().any(|k| *k == key)
        } else {
            self.keys.iter().any(|k| k == key)
        }
    }
}

// Per-character lowercase mapping (`str::to_lowercase`), no multi-char folds.
fn fold(key: &str) -> String {
    key.to_lowercase()
}

/// Return a copy of `value` with every denylisted key's value replaced by
/// [`REDACTED`], at any depth. A matched key is replaced wholesale even when
/// its value is a map or list. Scalars come back unchanged.
pub fn redact(value: &Value, policy: &RedactionPolicy) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_map(map, policy)),
        Value::Array(items) => Value::Array(items.iter().map(|item| redact(item, policy)).collect()),
        scalar => scalar.clone(),
    }
}

/// [`redact`] for a top-level map, keeping key order.
pub fn redact_map(map: &Map<String, Value>, policy: &RedactionPolicy) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = if policy.matches(key) {
                Value::String(REDACTED.to_string())
            } else {
                redact(value, policy)
            };
            (key.clone(), value)
        })
        .collect()
}

/// Output filter applying a [`RedactionPolicy`] to every record.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    policy: RedactionPolicy,
}

impl Redactor {
    pub fn new(policy: RedactionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RedactionPolicy {
        &self.policy
    }
}

impl OutputFilter for Redactor {
    fn filter(&self, record: Map<String, Value>) -> Map<String, Value> {
        redact_map(&record, &self.policy)
    }
}
