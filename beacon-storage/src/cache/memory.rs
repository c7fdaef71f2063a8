//! In-memory cache store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use beacon_core::CacheError;

use super::traits::CacheStore;

/// Broadcast buffer per pubsub channel. Slow subscribers lag and drop.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

/// Dashmap-backed [`CacheStore`] implementation.
///
/// Entry expiry is enforced on read: `get` past the deadline removes the
/// entry and reports absence. The `fail` toggle lets tests simulate a cache
/// outage, which must surface as an error and not as a miss.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, StoredValue>,
    sets: DashMap<String, BTreeSet<String>>,
    channels: DashMap<String, broadcast::Sender<String>>,
    fail: AtomicBool,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call returns `CacheError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of live (possibly expired, not yet purged) entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "simulated outage".to_string(),
            });
        }
        Ok(())
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_available()?;

        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) => {
                if Instant::now() < entry.expires_at {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.check_available()?;

        self.entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.check_available()?;

        let mut removed = 0u64;
        for key in keys {
            if self.entries.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn add_member(&self, set_key: &str, member: &str) -> Result<(), CacheError> {
        self.check_available()?;

        self.sets
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn members(&self, set_key: &str) -> Result<Vec<String>, CacheError> {
        self.check_available()?;

        Ok(self
            .sets
            .get(set_key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_set(&self, set_key: &str) -> Result<(), CacheError> {
        self.check_available()?;

        self.sets.remove(set_key);
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: String) -> Result<(), CacheError> {
        self.check_available()?;

        // A send with no receivers is fine; invalidation notices are
        // best-effort by contract.
        let _ = self.sender(channel).send(payload);
        Ok(())
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.sender(channel).subscribe()
    }
}
