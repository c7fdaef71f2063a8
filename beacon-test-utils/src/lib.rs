//! Beacon Test Utilities
//!
//! Shared fixtures and helpers for the beacon workspace: draft builders
//! with sensible defaults, and a polling helper for asserting on the
//! detached side effects of the write path.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;

use beacon_core::{Event, NewEvent};

/// Builder for event drafts. Defaults are valid; override what the test
/// cares about.
#[derive(Debug, Clone)]
pub struct DraftBuilder {
    draft: NewEvent,
}

impl DraftBuilder {
    pub fn new() -> Self {
        Self {
            draft: NewEvent {
                timestamp: Utc::now() - chrono::Duration::seconds(30),
                subject_id: "u1".to_string(),
                category: "Chrome".to_string(),
                source_url: "https://example.com/page".to_string(),
                message: "TypeError: x is undefined".to_string(),
                trace: "at render (app.js:42)".to_string(),
            },
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.draft.subject_id = subject.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.draft.category = category.to_string();
        self
    }

    pub fn source_url(mut self, url: &str) -> Self {
        self.draft.source_url = url.to_string();
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.draft.message = message.to_string();
        self
    }

    pub fn timestamp(mut self, timestamp: beacon_core::Timestamp) -> Self {
        self.draft.timestamp = timestamp;
        self
    }

    pub fn build(self) -> NewEvent {
        self.draft
    }
}

impl Default for DraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A valid draft with default fixture values.
pub fn draft() -> NewEvent {
    DraftBuilder::new().build()
}

/// A fixture event, as if persisted.
pub fn event() -> Event {
    draft().into_event(beacon_core::new_event_id(), Utc::now())
}

/// Poll an async condition until it holds or the timeout elapses. Returns
/// whether the condition was met; lets tests wait out the detached
/// post-write side effects without fixed sleeps.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
