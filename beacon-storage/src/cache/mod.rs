//! Tag-addressable cache layer.
//!
//! Three pieces, layered like the production deployment:
//!
//! - [`CacheStore`] is the collaborator contract: string key/value with TTL,
//!   set membership for tag reverse-indexes, and a broadcast channel for
//!   cross-instance invalidation notices.
//! - [`InMemoryCacheStore`] implements the contract in-process.
//! - [`TaggedCache`] sits on top and owns the cache-entry envelope, lazy
//!   expiry, tag registration, and bulk invalidation by tag.
//!
//! A logical miss and an I/O failure are distinct outcomes: a miss triggers
//! the caller's read-through path, a failure must not suppress fallback and
//! is surfaced as a [`CacheError`](beacon_core::CacheError) for the caller
//! to log and swallow.

pub mod memory;
pub mod tagged;
pub mod traits;

pub use memory::InMemoryCacheStore;
pub use tagged::{
    CacheOutcome, CacheWriteOptions, InvalidationNotice, TagInvalidation, TaggedCache,
};
pub use traits::CacheStore;
