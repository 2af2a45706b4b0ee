//! HTTP transport: one request in, one envelope or one [`ApiError`] out.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::error::{error_summary, ApiError};
use crate::utils::url::resolve_endpoint;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Everything needed to issue one request. Built per call and consumed by
/// the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCall {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl EndpointCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a query parameter; `None` values are left out of the URL.
    pub fn query<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.query.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Successful call result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn new(data: T, status: u16) -> Self {
        Self {
            data,
            status,
            message: None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            data: f(self.data),
            status: self.status,
            message: self.message,
        }
    }
}

#[async_trait]
/// Transport contract used by [`crate::api::ApiClient`].
///
/// Implementations must map every failure (network, non-2xx, unparsable
/// body, timeout) onto [`ApiError`] and never panic on server input.
pub trait Transport: Send + Sync {
    async fn send(&self, call: EndpointCall) -> Result<Envelope<Value>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub base_url: String,
    pub default_headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl TransportSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}

/// Merges header lists; a later entry replaces an earlier one with the same
/// name (compared case-insensitively) while keeping the earlier position.
pub fn merge_headers(
    defaults: &[(String, String)],
    overrides: &[(String, String)],
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::with_capacity(defaults.len() + overrides.len());
    for (name, value) in defaults.iter().chain(overrides.iter()) {
        match merged
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.clone(),
            None => merged.push((name.clone(), value.clone())),
        }
    }
    merged
}

pub struct HttpTransport {
    client: reqwest::Client,
    settings: TransportSettings,
    default_headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(settings: TransportSettings) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder().timeout(settings.timeout);
        if let Some(agent) = settings.user_agent.as_deref() {
            builder = builder.user_agent(agent.to_string());
        }
        let client = builder.build()?;

        let base = [
            ("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string()),
            ("Accept".to_string(), JSON_CONTENT_TYPE.to_string()),
        ];
        let default_headers = merge_headers(&base, &settings.default_headers);

        Ok(Self {
            client,
            settings,
            default_headers,
        })
    }

    async fn execute(&self, call: EndpointCall) -> Result<Envelope<Value>, ApiError> {
        let url = resolve_endpoint(&self.settings.base_url, &call.path);
        debug!(method = call.method.as_str(), url = %url, "Sending API request");

        let mut request = self.client.request(call.method.to_reqwest(), &url);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        for (name, value) in merge_headers(&self.default_headers, &call.headers) {
            request = request.header(name, value);
        }
        if let Some(body) = call.body.as_ref() {
            let payload = serde_json::to_vec(body)
                .map_err(|err| ApiError::transport(format!("Failed to encode body: {err}")))?;
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        debug!(url = %url, status, bytes = bytes.len(), "API response received");

        if !(200..300).contains(&status) {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .as_ref()
                .and_then(error_summary)
                .unwrap_or_else(|| format!("HTTP {status}"));
            warn!(url = %url, status, message = %message, "API request failed");
            return Err(ApiError::http(status, message));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Envelope::new(Value::Null, status));
        }

        let data: Value = serde_json::from_slice(&bytes).map_err(|err| {
            ApiError::parse(status, format!("Invalid JSON in response body: {err}"))
        })?;
        let message = data
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        Ok(Envelope {
            data,
            status,
            message,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, call: EndpointCall) -> Result<Envelope<Value>, ApiError> {
        let limit = self.settings.timeout;
        match tokio::time::timeout(limit, self.execute(call)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "API request timed out");
                Err(ApiError::timeout(limit))
            }
        }
    }
}
