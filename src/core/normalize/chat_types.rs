use serde_json::Value;

use super::{
    array_at, field_count, field_str, lenient_label_map, strict_label_map, Normalizer, Strategy,
};
use crate::api::models::LabelCount;

const LABEL_KEYS: &[&str] = &["type", "label", "name", "chatType", "category"];
const COUNT_KEYS: &[&str] = &["count", "value", "total"];

const NESTED_ARRAY_PATHS: &[&str] = &[
    "/data",
    "/items",
    "/types",
    "/distribution",
    "/chatTypes",
    "/data/items",
    "/data/types",
    "/data/distribution",
    "/data/chatTypes",
];

const LABEL_MAP_PATHS: &[&str] = &[
    "/distribution",
    "/types",
    "/chatTypes",
    "/data/distribution",
    "/data/types",
    "/data/chatTypes",
    "/data",
];

const FLAT_OBJECT_PATHS: &[&str] = &["", "/data"];

static STRATEGIES: &[Strategy<LabelCount>] = &[
    Strategy {
        name: "direct-array",
        extract: direct_array,
    },
    Strategy {
        name: "nested-array",
        extract: nested_array,
    },
    Strategy {
        name: "label-map",
        extract: label_map,
    },
    Strategy {
        name: "flat-object",
        extract: flat_object,
    },
];

/// Chat-type distribution, as served by `/user/{id}/chat-type`.
pub static CHAT_TYPES: Normalizer<LabelCount> = Normalizer::new("chat-type", STRATEGIES);

pub fn normalize_chat_types(value: &Value) -> Vec<LabelCount> {
    CHAT_TYPES.normalize(value)
}

fn item(value: &Value) -> Option<LabelCount> {
    let object = value.as_object()?;
    let label = field_str(object, LABEL_KEYS)?;
    let count = field_count(object, COUNT_KEYS)?;
    Some(LabelCount::new(label, count))
}

fn items(values: &[Value]) -> Vec<LabelCount> {
    values.iter().filter_map(item).collect()
}

fn direct_array(value: &Value) -> Option<Vec<LabelCount>> {
    value.as_array().map(|values| items(values))
}

fn nested_array(value: &Value) -> Option<Vec<LabelCount>> {
    array_at(value, NESTED_ARRAY_PATHS).map(|values| items(values))
}

fn label_map(value: &Value) -> Option<Vec<LabelCount>> {
    LABEL_MAP_PATHS.iter().find_map(|pointer| {
        let object = value.pointer(pointer)?.as_object()?;
        strict_label_map(object).map(into_label_counts)
    })
}

fn flat_object(value: &Value) -> Option<Vec<LabelCount>> {
    FLAT_OBJECT_PATHS.iter().find_map(|pointer| {
        let object = value.pointer(pointer)?.as_object()?;
        lenient_label_map(object).map(into_label_counts)
    })
}

fn into_label_counts(pairs: Vec<(String, u64)>) -> Vec<LabelCount> {
    pairs
        .into_iter()
        .map(|(label, count)| LabelCount::new(label, count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counts(items: &[LabelCount]) -> Vec<(&str, u64)> {
        items.iter().map(|i| (i.label.as_str(), i.count)).collect()
    }

    #[test]
    fn array_of_type_count_maps_directly() {
        let out = normalize_chat_types(&json!([{"type": "chat", "count": 5}]));
        assert_eq!(out, vec![LabelCount::new("chat", 5)]);
    }

    #[test]
    fn nested_distribution_map_is_enumerated() {
        let payload = json!({"data": {"distribution": {"chat": 5, "donation": 2}}});
        let (strategy, out) = CHAT_TYPES.normalize_traced(&payload);
        assert_eq!(strategy, Some("label-map"));
        assert_eq!(out.len(), 2);
        let mut seen = counts(&out);
        seen.sort();
        assert_eq!(seen, vec![("chat", 5), ("donation", 2)]);
    }

    #[test]
    fn map_entries_keep_backend_order() {
        let payload = json!({"distribution": {"subscription": 1, "donation": 2, "chat": 5}});
        let out = normalize_chat_types(&payload);
        assert_eq!(
            counts(&out),
            vec![("subscription", 1), ("donation", 2), ("chat", 5)]
        );

        let flat = json!({"donation": "4", "note": "ignored", "chat": 10});
        assert_eq!(counts(&normalize_chat_types(&flat)), vec![("donation", 4), ("chat", 10)]);
    }

    #[test]
    fn unrecognized_object_is_empty() {
        assert!(normalize_chat_types(&json!({})).is_empty());
        assert!(normalize_chat_types(&json!(null)).is_empty());
        assert!(normalize_chat_types(&json!("chat")).is_empty());
        assert!(normalize_chat_types(&json!({"data": {"note": "none"}})).is_empty());
    }

    #[test]
    fn nested_types_array_is_used() {
        let payload = json!({"data": {"types": [{"type": "donation", "count": 3}]}});
        let (strategy, out) = CHAT_TYPES.normalize_traced(&payload);
        assert_eq!(strategy, Some("nested-array"));
        assert_eq!(out, vec![LabelCount::new("donation", 3)]);
    }

    #[test]
    fn map_of_count_objects_is_enumerated() {
        let payload = json!({"chat": {"count": 7}, "donation": {"count": "2"}, "total": 9});
        let out = normalize_chat_types(&payload);
        assert_eq!(counts(&out), vec![("chat", 7), ("donation", 2)]);
    }

    #[test]
    fn flat_object_ignores_metadata_and_text_fields() {
        let payload = json!({
            "CHAT": 10,
            "DONATION": "4",
            "userId": 123,
            "timestamp": 1700000000,
            "note": "ignored"
        });
        let (strategy, out) = CHAT_TYPES.normalize_traced(&payload);
        assert_eq!(strategy, Some("flat-object"));
        assert_eq!(counts(&out), vec![("CHAT", 10), ("DONATION", 4)]);
    }

    #[test]
    fn missing_count_defaults_to_zero_and_negative_is_dropped() {
        let payload = json!([
            {"type": "chat"},
            {"type": "donation", "count": -3},
            {"type": "subscription", "count": "NaN"},
            {"count": 4},
            "garbage"
        ]);
        let out = normalize_chat_types(&payload);
        assert_eq!(counts(&out), vec![("chat", 0), ("subscription", 0)]);
    }

    #[test]
    fn input_is_not_mutated() {
        let payload = json!({"data": {"distribution": {"chat": 1}}});
        let before = payload.clone();
        let first = normalize_chat_types(&payload);
        let second = normalize_chat_types(&payload);
        assert_eq!(payload, before);
        assert_eq!(first, second);
    }

    #[test]
    fn strategies_run_in_declared_order() {
        assert_eq!(
            CHAT_TYPES.strategy_names(),
            vec!["direct-array", "nested-array", "label-map", "flat-object"]
        );
    }
}
