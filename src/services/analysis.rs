use serde_json::Value;
use tracing::debug;

use crate::api::error::error_summary;
use crate::api::models::{AnalysisReport, AnalysisRequest};
use crate::api::{ApiClient, ApiError, Envelope};
use crate::core::normalize::{normalize_frequent_words, normalize_word_cloud};

/// The serverless analysis function. Its URL is absolute and is not joined
/// onto the main API base.
#[derive(Clone)]
pub struct AnalysisEndpoint {
    client: ApiClient,
    url: String,
}

impl AnalysisEndpoint {
    pub fn new(client: ApiClient, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn run(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Envelope<AnalysisReport>, ApiError> {
        run_analysis(&self.client, &self.url, request).await
    }
}

/// Posts `request` and normalizes both word lists.
///
/// A body with `"success": false` is reported as an HTTP error carrying the
/// body's message, even when the status line was 2xx.
pub async fn run_analysis(
    client: &ApiClient,
    url: &str,
    request: &AnalysisRequest,
) -> Result<Envelope<AnalysisReport>, ApiError> {
    let envelope = client.post::<Value, _>(url, Some(request)).await?;
    if envelope.data.get("success").and_then(Value::as_bool) == Some(false) {
        let message = error_summary(&envelope.data)
            .or(envelope.message.clone())
            .unwrap_or_else(|| "Analysis failed".to_string());
        debug!(status = envelope.status, %message, "Analysis reported failure");
        return Err(ApiError::http(envelope.status, message));
    }
    Ok(envelope.map(|raw| AnalysisReport {
        word_cloud: normalize_word_cloud(&raw),
        frequent_words: normalize_frequent_words(&raw),
    }))
}
