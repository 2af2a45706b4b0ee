use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::api::transport::TransportSettings;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

pub const ENV_API_URL: &str = "CHATLENS_API_URL";
pub const ENV_ANALYSIS_URL: &str = "CHATLENS_ANALYSIS_URL";
pub const ENV_TIMEOUT_SECS: &str = "CHATLENS_TIMEOUT_SECS";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the analytics API (e.g., "https://api.example.com")
    pub api_base_url: Option<String>,
    /// Absolute URL of the serverless analysis function
    pub analysis_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Refresh interval for `follow`, in seconds
    pub poll_interval_secs: Option<u64>,
    pub user_agent: Option<String>,
    /// Extra headers sent with every request
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl Config {
    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.filter(|s| *s > 0).unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        )
    }

    /// Applies `CHATLENS_*` overrides from `lookup`. Blank values and
    /// unparsable timeouts are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = present(ENV_API_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(url) = present(ENV_ANALYSIS_URL) {
            self.analysis_url = Some(url);
        }
        if let Some(secs) = present(ENV_TIMEOUT_SECS).and_then(|v| v.trim().parse().ok()) {
            self.timeout_secs = Some(secs);
        }
    }

    pub fn transport_settings(&self) -> TransportSettings {
        self.settings_for(self.api_base_url())
    }

    /// Settings for the analysis client. The analysis URL is absolute, so the
    /// base only matters when it is missing.
    pub fn analysis_transport_settings(&self) -> Option<TransportSettings> {
        self.analysis_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| self.settings_for(url))
    }

    fn settings_for(&self, base_url: &str) -> TransportSettings {
        let mut settings = TransportSettings::new(base_url).with_timeout(self.timeout());
        settings.user_agent = self.user_agent.clone();
        for (name, value) in &self.default_headers {
            settings = settings.with_header(name.clone(), value.clone());
        }
        settings
    }

    /// Sets a key by its TOML name. Used by `config set`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key {
            "api_base_url" => self.api_base_url = Some(value.to_string()),
            "analysis_url" => self.analysis_url = Some(value.to_string()),
            "user_agent" => self.user_agent = Some(value.to_string()),
            "timeout_secs" => self.timeout_secs = Some(parse_seconds(key, value)?),
            "poll_interval_secs" => self.poll_interval_secs = Some(parse_seconds(key, value)?),
            other => match other.strip_prefix("header.") {
                Some(name) if !name.is_empty() => {
                    if value.is_empty() {
                        self.default_headers.remove(name);
                    } else {
                        self.default_headers
                            .insert(name.to_string(), value.to_string());
                    }
                }
                _ => return Err(format!("Unknown config key: {other}")),
            },
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "api_base_url" => self.api_base_url = None,
            "analysis_url" => self.analysis_url = None,
            "user_agent" => self.user_agent = None,
            "timeout_secs" => self.timeout_secs = None,
            "poll_interval_secs" => self.poll_interval_secs = None,
            other => match other.strip_prefix("header.") {
                Some(name) if !name.is_empty() => {
                    self.default_headers.remove(name);
                }
                _ => return Err(format!("Unknown config key: {other}")),
            },
        }
        Ok(())
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(format!("{key} must be a positive number of seconds")),
    }
}

pub fn path_display(path: &Path) -> String {
    path.display().to_string()
}
