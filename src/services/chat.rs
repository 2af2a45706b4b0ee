use serde_json::Value;

use crate::api::models::{Channel, ChatMessage, ChatQuery};
use crate::api::{ApiClient, ApiError, EndpointCall, Envelope, Method};
use crate::core::normalize::{normalize_channels, normalize_chat_messages};

pub const CHANNEL_PATH: &str = "/channel";
pub const CHAT_PATH: &str = "/chat";

pub async fn fetch_channels(client: &ApiClient) -> Result<Envelope<Vec<Channel>>, ApiError> {
    let envelope = client.get::<Value>(CHANNEL_PATH).await?;
    Ok(envelope.map(|raw| normalize_channels(&raw)))
}

pub fn chat_call(query: &ChatQuery) -> EndpointCall {
    EndpointCall::new(Method::Get, CHAT_PATH)
        .query("uuid", query.uuid.as_deref())
        .query("chatChannelId", query.channel_id.as_deref())
        .query("limit", query.limit)
        .query("from", query.from.as_deref())
        .query("to", query.to.as_deref())
        .query("message", query.message.as_deref())
        .query("userIdHash", query.user_id_hash.as_deref())
        .query("nickname", query.nickname.as_deref())
        .query("chatType", query.chat_type.as_deref())
}

/// Fetch failures are returned as-is; no placeholder messages are
/// substituted.
pub async fn fetch_chats(
    client: &ApiClient,
    query: &ChatQuery,
) -> Result<Envelope<Vec<ChatMessage>>, ApiError> {
    let envelope = client.request::<Value>(chat_call(query)).await?;
    Ok(envelope.map(|raw| normalize_chat_messages(&raw)))
}
