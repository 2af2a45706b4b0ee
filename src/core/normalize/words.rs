use serde_json::Value;

use super::{
    array_at, field_count, field_str, present_count, strict_label_map, Normalizer, Strategy,
};
use crate::api::models::WordFrequency;

const WORD_KEYS: &[&str] = &["word", "text", "name", "label"];
const COUNT_KEYS: &[&str] = &["count", "value", "frequency", "weight"];

const FREQUENT_ARRAY_PATHS: &[&str] = &[
    "/frequentWords",
    "/data/frequentWords",
    "/words",
    "/data/words",
    "/items",
    "/data/items",
    "/data",
];
const FREQUENT_MAP_PATHS: &[&str] = &[
    "/frequentWords",
    "/data/frequentWords",
    "/words",
    "/data/words",
];

const CLOUD_ARRAY_PATHS: &[&str] = &["/wordCloud", "/data/wordCloud", "/cloud", "/data/cloud"];
const CLOUD_MAP_PATHS: &[&str] = &["/wordCloud", "/data/wordCloud"];

static FREQUENT_STRATEGIES: &[Strategy<WordFrequency>] = &[
    Strategy {
        name: "direct-array",
        extract: direct_array,
    },
    Strategy {
        name: "nested-array",
        extract: frequent_nested_array,
    },
    Strategy {
        name: "word-map",
        extract: frequent_word_map,
    },
];

static CLOUD_STRATEGIES: &[Strategy<WordFrequency>] = &[
    Strategy {
        name: "direct-array",
        extract: direct_array,
    },
    Strategy {
        name: "nested-array",
        extract: cloud_nested_array,
    },
    Strategy {
        name: "word-map",
        extract: cloud_word_map,
    },
];

pub static FREQUENT_WORDS: Normalizer<WordFrequency> =
    Normalizer::new("frequent-words", FREQUENT_STRATEGIES);

pub static WORD_CLOUD: Normalizer<WordFrequency> = Normalizer::new("word-cloud", CLOUD_STRATEGIES);

pub fn normalize_frequent_words(value: &Value) -> Vec<WordFrequency> {
    FREQUENT_WORDS.normalize(value)
}

pub fn normalize_word_cloud(value: &Value) -> Vec<WordFrequency> {
    WORD_CLOUD.normalize(value)
}

/// `{"word": "hi", "count": 3}` or `["hi", 3]`.
fn item(value: &Value) -> Option<WordFrequency> {
    match value {
        Value::Object(object) => {
            let word = field_str(object, WORD_KEYS)?;
            let count = field_count(object, COUNT_KEYS)?;
            Some(WordFrequency::new(word, count))
        }
        Value::Array(pair) if pair.len() == 2 => {
            let word = pair[0].as_str().map(str::trim).filter(|w| !w.is_empty())?;
            let count = present_count(&pair[1])?;
            Some(WordFrequency::new(word, count))
        }
        _ => None,
    }
}

fn items(values: &[Value]) -> Vec<WordFrequency> {
    values.iter().filter_map(item).collect()
}

fn direct_array(value: &Value) -> Option<Vec<WordFrequency>> {
    value.as_array().map(|values| items(values))
}

fn frequent_nested_array(value: &Value) -> Option<Vec<WordFrequency>> {
    array_at(value, FREQUENT_ARRAY_PATHS).map(|values| items(values))
}

fn cloud_nested_array(value: &Value) -> Option<Vec<WordFrequency>> {
    array_at(value, CLOUD_ARRAY_PATHS).map(|values| items(values))
}

fn frequent_word_map(value: &Value) -> Option<Vec<WordFrequency>> {
    word_map(value, FREQUENT_MAP_PATHS)
}

fn cloud_word_map(value: &Value) -> Option<Vec<WordFrequency>> {
    word_map(value, CLOUD_MAP_PATHS)
}

/// Word→count objects carry no order, so results are ranked by count and
/// then alphabetically.
fn word_map(value: &Value, pointers: &[&str]) -> Option<Vec<WordFrequency>> {
    let pairs = pointers.iter().find_map(|pointer| {
        let object = value.pointer(pointer)?.as_object()?;
        strict_label_map(object)
    })?;
    let mut words: Vec<WordFrequency> = pairs
        .into_iter()
        .map(|(word, count)| WordFrequency::new(word, count))
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    Some(words)
}
