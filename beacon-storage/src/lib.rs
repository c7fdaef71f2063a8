//! Beacon Storage - Primary Store Trait and In-Memory Implementation
//!
//! Defines the storage abstraction for event records. The primary store is
//! the authoritative, durable record of events: source of truth for both
//! existence and content. The tag-addressable cache layer lives in the
//! [`cache`] module.

pub mod cache;
pub mod store;

pub use cache::{
    CacheOutcome, CacheStore, CacheWriteOptions, InMemoryCacheStore, InvalidationNotice,
    TagInvalidation, TaggedCache,
};
pub use store::{DistinctField, EventStore, InMemoryEventStore};
