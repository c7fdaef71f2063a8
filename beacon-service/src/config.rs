//! Cache TTL policy.

use std::time::Duration;

use crate::constants::{
    EVENT_CACHE_TTL_SECS, REFERENCE_CACHE_TTL_SECS, SEARCH_CACHE_TTL_SECS, STATS_CACHE_TTL_SECS,
};

/// TTLs applied by the cache-aside read paths.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub event_ttl: Duration,
    pub search_ttl: Duration,
    pub stats_ttl: Duration,
    pub reference_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            event_ttl: Duration::from_secs(EVENT_CACHE_TTL_SECS),
            search_ttl: Duration::from_secs(SEARCH_CACHE_TTL_SECS),
            stats_ttl: Duration::from_secs(STATS_CACHE_TTL_SECS),
            reference_ttl: Duration::from_secs(REFERENCE_CACHE_TTL_SECS),
        }
    }
}

impl CachePolicy {
    /// Build from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    /// - `BEACON_CACHE_EVENT_TTL_SECS` (default: 600)
    /// - `BEACON_CACHE_SEARCH_TTL_SECS` (default: 600)
    /// - `BEACON_CACHE_STATS_TTL_SECS` (default: 600)
    /// - `BEACON_CACHE_REFERENCE_TTL_SECS` (default: 1800)
    pub fn from_env() -> Self {
        fn ttl(var: &str, default: Duration) -> Duration {
            std::env::var(var)
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        }

        let defaults = Self::default();
        Self {
            event_ttl: ttl("BEACON_CACHE_EVENT_TTL_SECS", defaults.event_ttl),
            search_ttl: ttl("BEACON_CACHE_SEARCH_TTL_SECS", defaults.search_ttl),
            stats_ttl: ttl("BEACON_CACHE_STATS_TTL_SECS", defaults.stats_ttl),
            reference_ttl: ttl("BEACON_CACHE_REFERENCE_TTL_SECS", defaults.reference_ttl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = CachePolicy::default();
        assert_eq!(policy.event_ttl, Duration::from_secs(600));
        assert_eq!(policy.reference_ttl, Duration::from_secs(1800));
    }
}
