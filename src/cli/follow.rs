//! Live chat feed: polls `/chat` through an [`AsyncResource`] and prints
//! messages the first time they are seen.

use std::collections::{HashSet, VecDeque};
use std::error::Error;
use std::time::Duration;

use tracing::debug;

use crate::api::models::{ChatMessage, ChatQuery};
use crate::api::ApiError;
use crate::cli::output::{render_chat_line, Printer};
use crate::core::resource::{AsyncResource, ResourceState};
use crate::services::Services;

/// Upper bound on remembered message keys.
const SEEN_CAPACITY: usize = 5_000;

/// Remembers which messages were already printed.
///
/// Messages with an id are keyed by it; others by timestamp, author and text.
#[derive(Debug, Default)]
pub struct FeedTracker {
    seen: HashSet<String>,
    order: VecDeque<String>,
}

impl FeedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(message: &ChatMessage) -> String {
        match &message.id {
            Some(id) => format!("id:{id}"),
            None => format!(
                "{}|{}|{}",
                message.created_at.as_deref().unwrap_or_default(),
                message.nickname.as_deref().unwrap_or_default(),
                message.message
            ),
        }
    }

    /// Returns the messages not seen before, in input order.
    pub fn fresh(&mut self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut fresh = Vec::new();
        for message in messages {
            let key = Self::key(message);
            if self.seen.insert(key.clone()) {
                self.order.push_back(key);
                fresh.push(message.clone());
            }
        }
        while self.order.len() > SEEN_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        fresh
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

pub fn chat_feed(
    services: Services,
    query: ChatQuery,
) -> AsyncResource<Vec<ChatMessage>, ChatQuery> {
    AsyncResource::new(query, move |query: ChatQuery| {
        let services = services.clone();
        async move { services.chats(&query).await }
    })
}

/// What changed between two observed states, for printing.
#[derive(Debug, PartialEq)]
pub enum FeedEvent {
    Messages(Vec<ChatMessage>),
    Failed(ApiError),
    Recovered,
}

/// Folds one resource state into printable events. Repeated identical
/// errors are reported once.
pub fn observe(
    tracker: &mut FeedTracker,
    last_error: &mut Option<ApiError>,
    state: &ResourceState<Vec<ChatMessage>>,
) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    if let Some(error) = &state.error {
        if last_error.as_ref() != Some(error) {
            events.push(FeedEvent::Failed(error.clone()));
            *last_error = Some(error.clone());
        }
        return events;
    }
    if last_error.take().is_some() {
        events.push(FeedEvent::Recovered);
    }
    if let Some(messages) = &state.data {
        let fresh = tracker.fresh(messages);
        if !fresh.is_empty() {
            events.push(FeedEvent::Messages(fresh));
        }
    }
    events
}

fn print_events(printer: Printer, events: Vec<FeedEvent>) -> Result<(), Box<dyn Error>> {
    for event in events {
        match event {
            FeedEvent::Messages(messages) => {
                for message in &messages {
                    printer.print(message, render_chat_line)?;
                }
            }
            FeedEvent::Failed(error) => eprintln!("Error: {error}"),
            FeedEvent::Recovered => eprintln!("Connection restored."),
        }
    }
    Ok(())
}

/// Polls until Ctrl-C, then stops polling and tears the resource down.
pub async fn follow(
    services: Services,
    query: ChatQuery,
    interval: Duration,
    printer: Printer,
) -> Result<(), Box<dyn Error>> {
    let resource = chat_feed(services, query);
    let mut updates = resource.subscribe();
    let poller = resource.poll(interval);
    debug!(interval_ms = interval.as_millis() as u64, "Following chat feed");
    if !printer.is_json() {
        eprintln!("Following chat (Ctrl-C to stop)...");
    }

    let mut tracker = FeedTracker::new();
    let mut last_error = None;
    let mut printed_any = false;

    let outcome: Result<(), Box<dyn Error>> = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(Box::from),
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = updates.borrow_and_update().clone();
                if state.loading && state.data.is_none() && state.error.is_none() {
                    continue;
                }
                let events = observe(&mut tracker, &mut last_error, &state);
                printed_any |= events.iter().any(|e| matches!(e, FeedEvent::Messages(_)));
                print_events(printer, events)?;
            }
        }
    };

    poller.join().await;
    resource.teardown();
    if !printed_any && !printer.is_json() {
        println!("No chat messages received.");
    }
    outcome
}
