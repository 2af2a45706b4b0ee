use serde_json::Value;

use crate::api::models::{DateRange, LabelCount, WatchedStreamer};
use crate::api::{ApiClient, ApiError, EndpointCall, Envelope, Method};
use crate::core::normalize::{normalize_chat_types, normalize_watched_streamers};
use crate::utils::url::encode_segment;

pub fn chat_type_path(user_id: &str) -> String {
    format!("/user/{}/chat-type", encode_segment(user_id))
}

pub fn watched_streamers_path(user_id: &str) -> String {
    format!("/user/{}/watched-streamers", encode_segment(user_id))
}

fn ranged_call(path: String, range: &DateRange) -> EndpointCall {
    EndpointCall::new(Method::Get, path)
        .query("start", range.start)
        .query("end", range.end)
}

pub async fn fetch_chat_types(
    client: &ApiClient,
    user_id: &str,
    range: &DateRange,
) -> Result<Envelope<Vec<LabelCount>>, ApiError> {
    let call = ranged_call(chat_type_path(user_id), range);
    let envelope = client.request::<Value>(call).await?;
    Ok(envelope.map(|raw| normalize_chat_types(&raw)))
}

pub async fn fetch_watched_streamers(
    client: &ApiClient,
    user_id: &str,
    range: &DateRange,
    top_n: Option<u32>,
) -> Result<Envelope<Vec<WatchedStreamer>>, ApiError> {
    let call = ranged_call(watched_streamers_path(user_id), range).query("topN", top_n);
    let envelope = client.request::<Value>(call).await?;
    Ok(envelope.map(|raw| normalize_watched_streamers(&raw)))
}
