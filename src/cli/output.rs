//! Text and JSON rendering for command results.
//!
//! Renderers return strings so they can be tested without capturing stdout.
//! Empty collections always render an explicit line instead of nothing.

use serde::Serialize;

use crate::api::models::{
    AnalysisReport, Channel, ChatMessage, LabelCount, WatchedStreamer, WordFrequency,
};

pub const NO_CHANNELS: &str = "No channels found.";
pub const NO_CHATS: &str = "No chat messages found.";
pub const NO_CHAT_TYPES: &str = "No chat activity in this range.";
pub const NO_WATCHED: &str = "No watched streamers in this range.";
pub const NO_WORDS: &str = "No words found.";

/// Picks text or pretty JSON for every command.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn render<T: Serialize + ?Sized>(
        &self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> Result<String, serde_json::Error> {
        if self.json {
            serde_json::to_string_pretty(value)
        } else {
            Ok(text(value))
        }
    }

    pub fn print<T: Serialize + ?Sized>(
        &self,
        value: &T,
        text: impl FnOnce(&T) -> String,
    ) -> Result<(), serde_json::Error> {
        println!("{}", self.render(value, text)?);
        Ok(())
    }
}

pub fn render_channels(channels: &[Channel]) -> String {
    if channels.is_empty() {
        return NO_CHANNELS.to_string();
    }
    let width = channels.iter().map(|c| c.id.len()).max().unwrap_or(0);
    channels
        .iter()
        .map(|channel| {
            let mut line = format!(
                "{:<width$}  {}",
                channel.id,
                channel.name.as_deref().unwrap_or("-")
            );
            if channel.is_live == Some(true) {
                line.push_str("  [live]");
            }
            if let Some(followers) = channel.follower_count {
                line.push_str(&format!("  {followers} followers"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_chat_line(message: &ChatMessage) -> String {
    let mut line = String::new();
    if let Some(created_at) = &message.created_at {
        line.push_str(&format!("[{created_at}] "));
    }
    line.push_str(message.nickname.as_deref().unwrap_or("anonymous"));
    let kind = message.chat_type.as_deref();
    if let Some(kind) = kind.filter(|k| !k.eq_ignore_ascii_case("chat")) {
        line.push_str(&format!(" ({kind})"));
    }
    line.push_str(": ");
    line.push_str(&message.message);
    line
}

pub fn render_chats(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return NO_CHATS.to_string();
    }
    messages
        .iter()
        .map(render_chat_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn percent(count: u64, total: u128) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

pub fn render_chat_types(types: &[LabelCount]) -> String {
    if types.is_empty() {
        return NO_CHAT_TYPES.to_string();
    }
    let total: u128 = types.iter().map(|t| u128::from(t.count)).sum();
    let width = types.iter().map(|t| t.label.len()).max().unwrap_or(0);
    let mut lines: Vec<String> = types
        .iter()
        .map(|t| {
            format!(
                "{:<width$}  {:>8}  {:>5.1}%",
                t.label,
                t.count,
                percent(t.count, total)
            )
        })
        .collect();
    lines.push(format!("{:<width$}  {:>8}", "total", total));
    lines.join("\n")
}

pub fn render_watched(streamers: &[WatchedStreamer]) -> String {
    if streamers.is_empty() {
        return NO_WATCHED.to_string();
    }
    let width = streamers.iter().map(|s| s.name.len()).max().unwrap_or(0);
    streamers
        .iter()
        .enumerate()
        .map(|(index, s)| {
            let share = s
                .percentage
                .map(|p| format!("{p:>5.1}%"))
                .unwrap_or_default();
            format!("{:>3}. {:<width$}  {:>8}  {}", index + 1, s.name, s.count, share)
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_word_list(words: &[WordFrequency]) -> String {
    if words.is_empty() {
        return format!("  {NO_WORDS}");
    }
    let width = words.iter().map(|w| w.word.chars().count()).max().unwrap_or(0);
    words
        .iter()
        .map(|w| format!("  {:<width$}  {}", w.word, w.count))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_report(report: &AnalysisReport) -> String {
    format!(
        "Frequent words:\n{}\n\nWord cloud:\n{}",
        render_word_list(&report.frequent_words),
        render_word_list(&report.word_cloud)
    )
}
