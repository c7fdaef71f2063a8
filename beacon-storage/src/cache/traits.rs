//! Cache backend contract.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::broadcast;

use beacon_core::CacheError;

/// Low-level cache store contract.
///
/// Models the slice of a networked cache the tagged layer needs: single-key
/// get/set/delete with TTL, set membership operations for the tag
/// reverse-index, and publish/subscribe for invalidation notices. Single-key
/// and single-set operations are assumed atomic; nothing here re-implements
/// atomicity across keys.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the raw value at `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set `key` to `value`, expiring after `ttl`.
    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;

    /// Add `member` to the set at `set_key` (idempotent).
    async fn add_member(&self, set_key: &str, member: &str) -> Result<(), CacheError>;

    /// All members of the set at `set_key`; empty when the set is absent.
    async fn members(&self, set_key: &str) -> Result<Vec<String>, CacheError>;

    /// Delete the whole set at `set_key`.
    async fn delete_set(&self, set_key: &str) -> Result<(), CacheError>;

    /// Publish a payload on a broadcast channel. Best-effort; a payload with
    /// no subscribers is dropped.
    async fn publish(&self, channel: &str, payload: String) -> Result<(), CacheError>;

    /// Subscribe to a broadcast channel.
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<String>;
}
