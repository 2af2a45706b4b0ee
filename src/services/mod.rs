//! Endpoint-specific service functions.
//!
//! Each function issues one call through an [`ApiClient`] and hands the raw
//! JSON to the matching normalizer. [`Services`] bundles the clients built
//! from a [`Config`] so callers pass one value around instead of reaching for
//! globals.

pub mod analysis;
pub mod chat;
pub mod user_detail;

use crate::api::models::{
    AnalysisReport, AnalysisRequest, Channel, ChatMessage, ChatQuery, DateRange, LabelCount,
    WatchedStreamer,
};
use crate::api::{ApiClient, ApiError, Envelope};
use crate::core::config::Config;

pub use analysis::AnalysisEndpoint;

#[derive(Clone)]
pub struct Services {
    api: ApiClient,
    analysis: Option<AnalysisEndpoint>,
}

impl Services {
    pub fn new(api: ApiClient, analysis: Option<AnalysisEndpoint>) -> Self {
        Self { api, analysis }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let api = ApiClient::http(config.transport_settings())?;
        let analysis = match config.analysis_transport_settings() {
            Some(settings) => {
                let url = settings.base_url.clone();
                Some(AnalysisEndpoint::new(ApiClient::http(settings)?, url))
            }
            None => None,
        };
        Ok(Self::new(api, analysis))
    }

    pub fn analysis(&self) -> Option<&AnalysisEndpoint> {
        self.analysis.as_ref()
    }

    pub async fn channels(&self) -> Result<Envelope<Vec<Channel>>, ApiError> {
        chat::fetch_channels(&self.api).await
    }

    pub async fn chats(&self, query: &ChatQuery) -> Result<Envelope<Vec<ChatMessage>>, ApiError> {
        chat::fetch_chats(&self.api, query).await
    }

    pub async fn chat_types(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> Result<Envelope<Vec<LabelCount>>, ApiError> {
        user_detail::fetch_chat_types(&self.api, user_id, range).await
    }

    pub async fn watched_streamers(
        &self,
        user_id: &str,
        range: &DateRange,
        top_n: Option<u32>,
    ) -> Result<Envelope<Vec<WatchedStreamer>>, ApiError> {
        user_detail::fetch_watched_streamers(&self.api, user_id, range, top_n).await
    }

    /// Fails with a transport error when no analysis URL is configured.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Envelope<AnalysisReport>, ApiError> {
        match &self.analysis {
            Some(endpoint) => endpoint.run(request).await,
            None => Err(ApiError::transport(
                "No analysis URL configured (set analysis_url or CHATLENS_ANALYSIS_URL)",
            )),
        }
    }
}
