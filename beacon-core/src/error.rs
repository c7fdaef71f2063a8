//! Error types for beacon operations.
//!
//! The taxonomy separates fatal failures (validation, not-found, primary
//! store down) from degraded-dependency failures (search engine or cache
//! unreachable), which callers swallow after falling back to the source of
//! truth.

use thiserror::Error;
use uuid::Uuid;

/// Input validation errors. Non-retryable; the caller must fix the input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Primary store errors. The store is authoritative, so these are fatal to
/// the request that hit them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Primary store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Insert failed: {reason}")]
    InsertFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Search engine errors. Always non-fatal: the caller falls back to the
/// primary store and logs a warning.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Search engine unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Malformed query: {reason}")]
    MalformedQuery { reason: String },

    #[error("Indexing failed for document {id}: {reason}")]
    IndexFailed { id: Uuid, reason: String },
}

/// Cache errors. Always non-fatal: a cache failure degrades to a source-of-
/// truth read and is only visible in logs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },
}

/// Message bus errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("Bus client is not connected")]
    NotConnected,

    #[error("Publish to {topic} failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Subscribe to {topic} failed: {reason}")]
    SubscribeFailed { topic: String, reason: String },

    #[error("Malformed message at {topic}/{partition}@{offset}: {reason}")]
    MalformedMessage {
        topic: String,
        partition: u32,
        offset: u64,
        reason: String,
    },
}

/// Top-level error type returned by orchestrated operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BeaconError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Event {id} not found")]
    NotFound { id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

impl BeaconError {
    /// Whether this error reflects a degraded (non-authoritative) dependency
    /// rather than a fatal request failure.
    pub fn is_degraded(&self) -> bool {
        matches!(self, BeaconError::Search(_) | BeaconError::Cache(_))
    }

    pub fn not_found(id: Uuid) -> Self {
        BeaconError::NotFound { id }
    }
}

/// Result type alias used throughout the workspace.
pub type BeaconResult<T> = Result<T, BeaconError>;
