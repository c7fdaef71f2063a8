//! Search engine contract and document projection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use beacon_core::{Event, EventId, SearchError, Timestamp};

use crate::query::{SearchQuery, StatsQuery};

/// Denormalized event projection held by the search engine.
///
/// Mirrors the event shape plus the stable id. A document may be stale or
/// momentarily absent relative to the primary store; indexing is
/// asynchronous and best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub subject_id: String,
    pub category: String,
    pub source_url: String,
    pub message: String,
    pub trace: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Event> for SearchDocument {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            timestamp: event.timestamp,
            subject_id: event.subject_id.clone(),
            category: event.category.clone(),
            source_url: event.source_url.clone(),
            message: event.message.clone(),
            trace: event.trace.clone(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

impl SearchDocument {
    /// Rehydrate the event shape for query results.
    pub fn into_event(self) -> Event {
        Event {
            id: self.id,
            timestamp: self.timestamp,
            subject_id: self.subject_id,
            category: self.category,
            source_url: self.source_url,
            message: self.message,
            trace: self.trace,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// One hit page from the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchDocument>,
    pub total: u64,
    pub took_ms: u64,
}

/// A term bucket: one distinct value and its document count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsBucket {
    pub key: String,
    pub count: u64,
}

/// Aggregations returned by a stats query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsAggregations {
    pub total: u64,
    pub unique_subjects: u64,
    /// Top categories by count (at most 10), count-descending.
    pub by_category: Vec<TermsBucket>,
    /// Top source URLs by count (at most 10), count-descending.
    pub by_url: Vec<TermsBucket>,
    /// Top message values by count (at most 5), count-descending.
    pub top_messages: Vec<TermsBucket>,
    /// Daily histogram, `key` formatted `YYYY-MM-DD`, date-ascending.
    pub over_time: Vec<TermsBucket>,
}

/// Search engine collaborator contract.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Create the index if it does not exist yet; idempotent.
    async fn ensure_index(&self) -> Result<(), SearchError>;

    /// Write or overwrite one document.
    async fn index_document(&self, doc: SearchDocument) -> Result<(), SearchError>;

    /// Execute a paged search query.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError>;

    /// Execute an aggregation query.
    async fn stats(&self, query: &StatsQuery) -> Result<StatsAggregations, SearchError>;
}
