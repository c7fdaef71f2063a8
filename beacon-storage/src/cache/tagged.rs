//! Tagged cache over a [`CacheStore`] backend.
//!
//! Entries are stored as a JSON envelope carrying the payload, insertion
//! time, TTL, and tags. Expiry is lazy: a read past the deadline deletes the
//! entry and reports a miss, so a reader is never served a stale value even
//! if the backend's own TTL enforcement is coarser.
//!
//! Tag invalidation deletes every member key of each tag's reverse set,
//! drops the set itself, and publishes an [`InvalidationNotice`] on the
//! `cache:invalidate` channel so other process instances sharing the same
//! backend can drop local secondary caches.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::debug;

use beacon_core::CacheError;

use super::traits::CacheStore;

/// Namespace prefixed to every physical key.
const NAMESPACE: &str = "beacon";

/// Broadcast channel for cross-instance invalidation notices.
pub const INVALIDATION_CHANNEL: &str = "cache:invalidate";

/// Options for a cache write.
#[derive(Debug, Clone)]
pub struct CacheWriteOptions {
    pub ttl: Duration,
    pub tags: Vec<String>,
}

impl CacheWriteOptions {
    pub fn new(ttl: Duration, tags: Vec<String>) -> Self {
        Self { ttl, tags }
    }
}

/// Outcome of a cache read. A miss is a normal outcome; I/O failures are
/// reported separately as `CacheError`.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome<T> {
    Hit { value: T, tags: Vec<String> },
    Miss,
}

impl<T> CacheOutcome<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheOutcome::Hit { .. })
    }

    /// The hit value, if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            CacheOutcome::Hit { value, .. } => Some(value),
            CacheOutcome::Miss => None,
        }
    }
}

/// Result of a bulk tag invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInvalidation {
    pub tags: Vec<String>,
    /// Every key that had been registered under the invalidated tags.
    pub affected_keys: Vec<String>,
    /// How many of those keys still held a live entry when deleted.
    pub invalidated_count: u64,
}

/// Cross-instance invalidation notice, published after each tag
/// invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationNotice {
    pub tags: Vec<String>,
    pub keys: Vec<String>,
    /// Epoch milliseconds of the invalidation.
    pub timestamp: i64,
}

/// Stored envelope for a cache entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    data: serde_json::Value,
    /// Epoch milliseconds of insertion.
    inserted_at: i64,
    ttl_seconds: u64,
    tags: Vec<String>,
    key: String,
}

impl StoredEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.inserted_at + (self.ttl_seconds as i64) * 1000
    }
}

/// Tag-addressable cache.
#[derive(Clone)]
pub struct TaggedCache {
    store: Arc<dyn CacheStore>,
}

impl TaggedCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn entry_key(key: &str) -> String {
        format!("{}:cache:{}", NAMESPACE, key)
    }

    fn tag_key(tag: &str) -> String {
        format!("{}:tags:{}", NAMESPACE, tag)
    }

    /// Read a typed entry. Expired entries are purged and reported as a
    /// miss.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<CacheOutcome<T>, CacheError> {
        let physical = Self::entry_key(key);
        let raw = match self.store.get(&physical).await? {
            Some(raw) => raw,
            None => return Ok(CacheOutcome::Miss),
        };

        let entry: StoredEntry =
            serde_json::from_str(&raw).map_err(|e| CacheError::Serialization {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if entry.is_expired(Utc::now().timestamp_millis()) {
            self.store.delete(std::slice::from_ref(&physical)).await?;
            debug!(key, "cache entry expired on read");
            return Ok(CacheOutcome::Miss);
        }

        let value: T =
            serde_json::from_value(entry.data).map_err(|e| CacheError::Serialization {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CacheOutcome::Hit {
            value,
            tags: entry.tags,
        })
    }

    /// Write a typed entry and register its key under each tag's reverse
    /// set. Duplicate tags are idempotent no-ops.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        opts: CacheWriteOptions,
    ) -> Result<(), CacheError> {
        let physical = Self::entry_key(key);
        let entry = StoredEntry {
            data: serde_json::to_value(value).map_err(|e| CacheError::Serialization {
                key: key.to_string(),
                reason: e.to_string(),
            })?,
            inserted_at: Utc::now().timestamp_millis(),
            ttl_seconds: opts.ttl.as_secs(),
            tags: opts.tags.clone(),
            key: physical.clone(),
        };
        let raw = serde_json::to_string(&entry).map_err(|e| CacheError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        self.store.set_with_ttl(&physical, raw, opts.ttl).await?;

        for tag in &opts.tags {
            self.store
                .add_member(&Self::tag_key(tag), &physical)
                .await?;
        }
        Ok(())
    }

    /// Remove one entry by key.
    ///
    /// The key is NOT removed from tag reverse-sets; the sets accumulate
    /// stale members until a tag-level invalidation drops the whole set.
    pub async fn invalidate_key(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self.store.delete(&[Self::entry_key(key)]).await?;
        Ok(removed > 0)
    }

    /// Bulk-invalidate every entry registered under any of `tags`, then
    /// publish a cross-instance notice.
    pub async fn invalidate_tags(&self, tags: &[String]) -> Result<TagInvalidation, CacheError> {
        let mut affected_keys = Vec::new();
        let mut invalidated_count = 0u64;

        for tag in tags {
            let tag_key = Self::tag_key(tag);
            let members = self.store.members(&tag_key).await?;
            if members.is_empty() {
                continue;
            }
            invalidated_count += self.store.delete(&members).await?;
            self.store.delete_set(&tag_key).await?;
            affected_keys.extend(members);
        }

        let notice = InvalidationNotice {
            tags: tags.to_vec(),
            keys: affected_keys.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let payload =
            serde_json::to_string(&notice).map_err(|e| CacheError::Serialization {
                key: INVALIDATION_CHANNEL.to_string(),
                reason: e.to_string(),
            })?;
        self.store.publish(INVALIDATION_CHANNEL, payload).await?;

        debug!(
            tags = ?tags,
            invalidated = invalidated_count,
            "invalidated cache entries by tag"
        );

        Ok(TagInvalidation {
            tags: tags.to_vec(),
            affected_keys,
            invalidated_count,
        })
    }

    /// Subscribe to cross-instance invalidation notices.
    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<String> {
        self.store.subscribe(INVALIDATION_CHANNEL)
    }
}
