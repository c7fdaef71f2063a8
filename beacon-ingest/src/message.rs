//! Bus message envelope.
//!
//! The payload is a closed tagged enum rather than a free-form string
//! discriminant: an unknown `event_type` on the wire fails to parse and is
//! discarded as malformed, and the handler registry is keyed by the enum
//! discriminant, so dispatch is exhaustive at compile time.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use beacon_core::{NewEvent, Timestamp};

/// Version stamped into every produced envelope.
pub const SOURCE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Discriminant of a bus payload, used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ErrorEvent,
}

impl EventType {
    /// Wire/header representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ErrorEvent => "error_event",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed bus payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload", rename_all = "snake_case")]
pub enum BusPayload {
    ErrorEvent(NewEvent),
}

impl BusPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            BusPayload::ErrorEvent(_) => EventType::ErrorEvent,
        }
    }
}

/// Envelope produced once per create call and consumed one or more times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    #[serde(flatten)]
    pub payload: BusPayload,
    pub produced_at: Timestamp,
    pub source_version: String,
}

impl BusMessage {
    pub fn new(payload: BusPayload) -> Self {
        Self {
            payload,
            produced_at: Utc::now(),
            source_version: SOURCE_VERSION.to_string(),
        }
    }
}
