//! Uniform error shape for every failed API call.

use serde::Serialize;
use thiserror::Error;

/// Status reported when a failure happens before any HTTP status exists.
pub const UNKNOWN_STATUS: u16 = 500;

/// Status reported when the configured request timeout elapses.
pub const TIMEOUT_STATUS: u16 = 408;

/// Message used when the underlying failure carries no description.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Broad failure category. Lets callers tell a timeout from a refused
/// connection without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Network unreachable, DNS failure, connection reset.
    Transport,
    /// The configured request timeout elapsed.
    Timeout,
    /// The server answered with a status outside 200..=299.
    Http,
    /// A 2xx body that is not valid JSON or not the expected type.
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub kind: ApiErrorKind,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        Self {
            message,
            status,
            kind,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Transport, UNKNOWN_STATUS, message)
    }

    pub fn timeout(after: std::time::Duration) -> Self {
        Self::new(
            ApiErrorKind::Timeout,
            TIMEOUT_STATUS,
            format!("Request timed out after {} ms", after.as_millis()),
        )
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Http, status, message)
    }

    pub fn parse(status: u16, message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, status, message)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ApiErrorKind::Timeout
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::new(ApiErrorKind::Timeout, TIMEOUT_STATUS, err.to_string());
        }
        match err.status() {
            Some(status) => Self::http(status.as_u16(), err.to_string()),
            None => Self::transport(err.to_string()),
        }
    }
}

/// Pulls a human-readable summary out of a backend error body.
///
/// Backends disagree on the error schema, so this accepts `message`,
/// `error` as a string, and `error.message`.
pub(crate) fn error_summary(body: &serde_json::Value) -> Option<String> {
    body.pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| body.get("error").and_then(|v| v.as_str()))
        .or_else(|| body.get("message").and_then(|v| v.as_str()))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}
