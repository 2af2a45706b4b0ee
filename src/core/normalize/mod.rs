//! Response normalization.
//!
//! Backend endpoints return the same logical collection in several JSON
//! shapes. Each endpoint family gets a [`Normalizer`]: an ordered list of
//! named, pure [`Strategy`] functions. The first strategy that recognizes
//! the payload wins; when none does, the result is an empty collection.
//! Unrecognized input is never an error.

mod chat_types;
mod collections;
mod words;

pub use chat_types::{normalize_chat_types, CHAT_TYPES};
pub use collections::{
    normalize_channels, normalize_chat_messages, normalize_watched_streamers, CHANNELS,
    CHAT_MESSAGES, WATCHED_STREAMERS,
};
pub use words::{normalize_frequent_words, normalize_word_cloud, FREQUENT_WORDS, WORD_CLOUD};

use serde_json::{Map, Value};
use tracing::debug;

/// Keys that describe a payload rather than belong to the distribution.
pub const METADATA_KEYS: &[&str] = &[
    "total",
    "date",
    "timestamp",
    "start",
    "end",
    "userId",
    "success",
    "message",
];

pub struct Strategy<T> {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<Vec<T>>,
}

pub struct Normalizer<T: 'static> {
    family: &'static str,
    strategies: &'static [Strategy<T>],
}

impl<T> Normalizer<T> {
    pub const fn new(family: &'static str, strategies: &'static [Strategy<T>]) -> Self {
        Self { family, strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    pub fn normalize(&self, value: &Value) -> Vec<T> {
        self.normalize_traced(value).1
    }

    /// Like [`Normalizer::normalize`] but also reports which strategy matched.
    pub fn normalize_traced(&self, value: &Value) -> (Option<&'static str>, Vec<T>) {
        for strategy in self.strategies {
            if let Some(items) = (strategy.extract)(value) {
                debug!(
                    family = self.family,
                    strategy = strategy.name,
                    items = items.len(),
                    "Normalized response"
                );
                return (Some(strategy.name), items);
            }
        }
        debug!(
            family = self.family,
            kind = json_kind(value),
            "No normalization strategy matched; using empty result"
        );
        (None, Vec::new())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True for JSON numbers and strings holding a finite number.
pub(crate) fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(f64::is_finite)
            .unwrap_or(false),
        _ => false,
    }
}

/// Converts a numeric JSON value to a count. Negative, non-finite and
/// non-numeric values yield `None`; fractions are truncated.
pub(crate) fn coerce_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            })
        }
        _ => None,
    }
}

/// Count for a field that exists: numeric values are coerced (negative ones
/// rejected), anything else counts as zero.
pub(crate) fn present_count(value: &Value) -> Option<u64> {
    if is_numeric(value) {
        coerce_count(value)
    } else {
        Some(0)
    }
}

/// First count found under `keys`; an object carrying none of them counts
/// as zero.
pub(crate) fn field_count(object: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .find_map(|key| object.get(*key))
        .map(present_count)
        .unwrap_or(Some(0))
}

pub(crate) fn field_str<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// A number, a numeric string, or an object with a `count` field.
pub(crate) fn is_count_bearing(value: &Value) -> bool {
    is_numeric(value) || value.as_object().is_some_and(|o| o.contains_key("count"))
}

/// Count for a label-map entry.
pub(crate) fn entry_count(value: &Value) -> Option<u64> {
    match value {
        Value::Object(object) => object.get("count").map(present_count).unwrap_or(Some(0)),
        other => present_count(other),
    }
}

pub(crate) fn is_metadata_key(key: &str) -> bool {
    METADATA_KEYS.contains(&key)
}

/// First array found at one of the JSON pointers.
pub(crate) fn array_at<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a Vec<Value>> {
    pointers
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_array))
}

/// Enumerates an object whose non-metadata values are all count-bearing.
pub(crate) fn strict_label_map(object: &Map<String, Value>) -> Option<Vec<(String, u64)>> {
    let entries: Vec<(&String, &Value)> = object
        .iter()
        .filter(|(key, _)| !is_metadata_key(key))
        .collect();
    if entries.is_empty() || !entries.iter().all(|(_, v)| is_count_bearing(v)) {
        return None;
    }
    Some(
        entries
            .into_iter()
            .filter_map(|(key, v)| entry_count(v).map(|count| (key.clone(), count)))
            .collect(),
    )
}

/// Enumerates the count-bearing, non-metadata fields of an object, ignoring
/// the rest.
pub(crate) fn lenient_label_map(object: &Map<String, Value>) -> Option<Vec<(String, u64)>> {
    let pairs: Vec<(String, u64)> = object
        .iter()
        .filter(|(key, v)| !is_metadata_key(key) && is_count_bearing(v))
        .filter_map(|(key, v)| entry_count(v).map(|count| (key.clone(), count)))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs)
    }
}
