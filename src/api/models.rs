use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One category in a distribution, e.g. `chat` or `donation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

impl LabelCount {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(alias = "channelId", alias = "chatChannelId")]
    pub id: String,
    #[serde(default, alias = "channelName")]
    pub name: Option<String>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub is_live: Option<bool>,
    #[serde(default, alias = "channelImageUrl")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, alias = "uuid")]
    pub id: Option<String>,
    #[serde(default, alias = "chatChannelId")]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub user_id_hash: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_type: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Filters for `GET /chat`. Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatQuery {
    pub uuid: Option<String>,
    pub channel_id: Option<String>,
    pub limit: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub message: Option<String>,
    pub user_id_hash: Option<String>,
    pub nickname: Option<String>,
    pub chat_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedStreamer {
    pub name: String,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrequency {
    pub word: String,
    pub count: u64,
}

impl WordFrequency {
    pub fn new(word: impl Into<String>, count: u64) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }
}

/// Inclusive date window passed as `start`/`end` query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// A window ending today and spanning `days` days.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(chrono::Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(today);
        Self {
            start: Some(start),
            end: Some(today),
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisTask {
    #[serde(rename = "wordCloud")]
    WordCloud,
    #[serde(rename = "frequentWords")]
    FrequentWords,
}

impl AnalysisTask {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wordcloud" | "word-cloud" | "word_cloud" => Some(Self::WordCloud),
            "frequentwords" | "frequent-words" | "frequent_words" => Some(Self::FrequentWords),
            _ => None,
        }
    }
}

/// Body for the serverless analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub user_id_hash: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tasks: Vec<AnalysisTask>,
    pub top_n: u32,
    pub max_items: u32,
    pub exclude_emotes: bool,
}

impl AnalysisRequest {
    pub fn new(user_id_hash: impl Into<String>, range: DateRange) -> Self {
        Self {
            user_id_hash: user_id_hash.into(),
            start_date: range.start,
            end_date: range.end,
            tasks: vec![AnalysisTask::WordCloud, AnalysisTask::FrequentWords],
            top_n: 20,
            max_items: 100,
            exclude_emotes: true,
        }
    }
}

/// Normalized analysis result. Either list may be empty when the task was
/// not requested or the backend returned an unrecognized shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub word_cloud: Vec<WordFrequency>,
    pub frequent_words: Vec<WordFrequency>,
}
