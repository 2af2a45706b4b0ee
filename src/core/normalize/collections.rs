use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{array_at, field_count, field_str, strict_label_map, Normalizer, Strategy};
use crate::api::models::{Channel, ChatMessage, WatchedStreamer};

const MESSAGE_PATHS: &[&str] = &[
    "/items",
    "/data",
    "/messages",
    "/chats",
    "/data/items",
    "/data/messages",
];
const CHANNEL_PATHS: &[&str] = &[
    "/data",
    "/items",
    "/channels",
    "/data/items",
    "/data/channels",
];
const STREAMER_PATHS: &[&str] = &[
    "/data",
    "/items",
    "/streamers",
    "/data/items",
    "/data/streamers",
];
const STREAMER_MAP_PATHS: &[&str] = &["/streamers", "/data/streamers", "/data"];

const STREAMER_NAME_KEYS: &[&str] = &["name", "streamer", "channelName", "nickname"];
const STREAMER_COUNT_KEYS: &[&str] = &["count", "value", "watchCount"];

static MESSAGE_STRATEGIES: &[Strategy<ChatMessage>] = &[
    Strategy {
        name: "direct-array",
        extract: decode_direct::<ChatMessage>,
    },
    Strategy {
        name: "nested-array",
        extract: messages_nested,
    },
];

static CHANNEL_STRATEGIES: &[Strategy<Channel>] = &[
    Strategy {
        name: "direct-array",
        extract: decode_direct::<Channel>,
    },
    Strategy {
        name: "nested-array",
        extract: channels_nested,
    },
];

static STREAMER_STRATEGIES: &[Strategy<WatchedStreamer>] = &[
    Strategy {
        name: "direct-array",
        extract: streamers_direct,
    },
    Strategy {
        name: "nested-array",
        extract: streamers_nested,
    },
    Strategy {
        name: "name-map",
        extract: streamers_map,
    },
];

pub static CHAT_MESSAGES: Normalizer<ChatMessage> =
    Normalizer::new("chat-messages", MESSAGE_STRATEGIES);

pub static CHANNELS: Normalizer<Channel> = Normalizer::new("channels", CHANNEL_STRATEGIES);

pub static WATCHED_STREAMERS: Normalizer<WatchedStreamer> =
    Normalizer::new("watched-streamers", STREAMER_STRATEGIES);

pub fn normalize_chat_messages(value: &Value) -> Vec<ChatMessage> {
    CHAT_MESSAGES.normalize(value)
}

pub fn normalize_channels(value: &Value) -> Vec<Channel> {
    CHANNELS.normalize(value)
}

/// Watched streamers with every `percentage` filled in. Missing shares are
/// derived from the counts when the backend leaves them out.
pub fn normalize_watched_streamers(value: &Value) -> Vec<WatchedStreamer> {
    let mut streamers = WATCHED_STREAMERS.normalize(value);
    fill_percentages(&mut streamers);
    streamers
}

/// Elements that do not decode are dropped rather than failing the batch.
fn decode_items<T: DeserializeOwned>(values: &[Value]) -> Vec<T> {
    values
        .iter()
        .filter_map(|value| serde_json::from_value(value.clone()).ok())
        .collect()
}

fn decode_direct<T: DeserializeOwned>(value: &Value) -> Option<Vec<T>> {
    value.as_array().map(|values| decode_items(values))
}

fn messages_nested(value: &Value) -> Option<Vec<ChatMessage>> {
    array_at(value, MESSAGE_PATHS).map(|values| decode_items(values))
}

fn channels_nested(value: &Value) -> Option<Vec<Channel>> {
    array_at(value, CHANNEL_PATHS).map(|values| decode_items(values))
}

fn streamer(value: &Value) -> Option<WatchedStreamer> {
    let object = value.as_object()?;
    let name = field_str(object, STREAMER_NAME_KEYS)?;
    let count = field_count(object, STREAMER_COUNT_KEYS)?;
    let percentage = object
        .get("percentage")
        .and_then(Value::as_f64)
        .filter(|p| p.is_finite() && *p >= 0.0);
    Some(WatchedStreamer {
        name: name.to_string(),
        count,
        percentage,
    })
}

fn streamers_direct(value: &Value) -> Option<Vec<WatchedStreamer>> {
    value
        .as_array()
        .map(|values| values.iter().filter_map(streamer).collect())
}

fn streamers_nested(value: &Value) -> Option<Vec<WatchedStreamer>> {
    array_at(value, STREAMER_PATHS).map(|values| values.iter().filter_map(streamer).collect())
}

fn streamers_map(value: &Value) -> Option<Vec<WatchedStreamer>> {
    let pairs = STREAMER_MAP_PATHS.iter().find_map(|pointer| {
        let object = value.pointer(pointer)?.as_object()?;
        strict_label_map(object)
    })?;
    let mut streamers: Vec<WatchedStreamer> = pairs
        .into_iter()
        .map(|(name, count)| WatchedStreamer {
            name,
            count,
            percentage: None,
        })
        .collect();
    streamers.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    Some(streamers)
}

fn fill_percentages(streamers: &mut [WatchedStreamer]) {
    let total: u128 = streamers.iter().map(|s| u128::from(s.count)).sum();
    if total == 0 {
        return;
    }
    for streamer in streamers.iter_mut().filter(|s| s.percentage.is_none()) {
        let share = streamer.count as f64 * 100.0 / total as f64;
        streamer.percentage = Some((share * 10.0).round() / 10.0);
    }
}
