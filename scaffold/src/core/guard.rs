//! Step guards over the run options bag.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Run-time options. Opaque to the engine except for guards and template rendering.
pub type Options = BTreeMap<String, Value>;

/// Predicate deciding whether a step runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    /// Run only when the option is truthy.
    Enabled(String),
    /// Run only when the option is falsy or absent.
    Disabled(String),
    /// Run only when the option equals `value`.
    Equals { key: String, value: Value },
}

impl Guard {
    pub fn key(&self) -> &str {
        match self {
            Guard::Enabled(key) | Guard::Disabled(key) => key,
            Guard::Equals { key, .. } => key,
        }
    }

    pub fn allows(&self, options: &Options) -> bool {
        match self {
            Guard::Enabled(key) => options.get(key).is_some_and(is_truthy),
            Guard::Disabled(key) => !options.get(key).is_some_and(is_truthy),
            Guard::Equals { key, value } => options.get(key) == Some(value),
        }
    }
}

/// `overrides` on top of `defaults`; keys in both take the override.
pub fn layered(defaults: &Options, overrides: &Options) -> Options {
    let mut options = defaults.clone();
    options.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    options
}

/// `false`, `null`, zero and empty values are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Parse a `key=value` assignment. Values become bools or integers when they
/// look like one, strings otherwise. A bare `key` means `key=true`.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key.trim(), parse_value(value)),
        None => (raw.trim(), Value::Bool(true)),
    };
    if key.is_empty() {
        return Err(format!("option assignment {raw:?} has an empty key"));
    }
    Ok((key.to_string(), value))
}

fn parse_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}
