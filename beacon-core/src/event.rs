//! Event record types.
//!
//! An [`Event`] is the immutable unit of ingestion: created once by the
//! write path, never mutated, removed only by retention at the store level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::ValidationError;

/// Event identifier using UUIDv7 for timestamp-sortable IDs.
pub type EventId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EventId (timestamp-sortable).
pub fn new_event_id() -> EventId {
    Uuid::now_v7()
}

/// A persisted event record.
///
/// Fields are fixed at creation; there is no in-place update operation
/// anywhere in the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// When the event occurred at its source.
    pub timestamp: Timestamp,
    /// The subject (user, device, tenant...) the event belongs to.
    pub subject_id: String,
    /// Coarse category of the source, e.g. a browser or client name.
    pub category: String,
    /// URL of the page or resource the event originated from.
    pub source_url: String,
    /// Primary message text.
    pub message: String,
    /// Supporting trace text (stack trace, context dump).
    pub trace: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Create request for an event: everything but the store-assigned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub timestamp: Timestamp,
    pub subject_id: String,
    pub category: String,
    pub source_url: String,
    pub message: String,
    pub trace: String,
}

impl NewEvent {
    /// Validate the draft before it reaches the primary store.
    ///
    /// Rules: no empty text fields, the timestamp must not be in the
    /// future, and the source URL must parse as an absolute URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timestamp > Utc::now() {
            return Err(ValidationError::InvalidValue {
                field: "timestamp".to_string(),
                reason: "timestamp cannot be in the future".to_string(),
            });
        }

        Self::require_non_empty("subject_id", &self.subject_id)?;
        Self::require_non_empty("category", &self.category)?;
        Self::require_non_empty("source_url", &self.source_url)?;
        Self::require_non_empty("message", &self.message)?;
        Self::require_non_empty("trace", &self.trace)?;

        Url::parse(&self.source_url).map_err(|e| ValidationError::InvalidValue {
            field: "source_url".to_string(),
            reason: format!("invalid URL: {}", e),
        })?;

        Ok(())
    }

    fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: field.to_string(),
            });
        }
        Ok(())
    }

    /// Materialize the draft into a full event with store-assigned fields.
    pub fn into_event(self, id: EventId, now: Timestamp) -> Event {
        Event {
            id,
            timestamp: self.timestamp,
            subject_id: self.subject_id,
            category: self.category,
            source_url: self.source_url,
            message: self.message,
            trace: self.trace,
            created_at: now,
            updated_at: now,
        }
    }
}
