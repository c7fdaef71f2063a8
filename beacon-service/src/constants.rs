//! Named defaults for cache policy and key scopes.

/// TTL for single-event lookups (seconds).
pub const EVENT_CACHE_TTL_SECS: u64 = 600;

/// TTL for search result pages (seconds).
pub const SEARCH_CACHE_TTL_SECS: u64 = 600;

/// TTL for aggregate stats (seconds). Aggregates are more expensive and
/// change more slowly than individual lookups.
pub const STATS_CACHE_TTL_SECS: u64 = 600;

/// TTL for reference lists of distinct values (seconds).
pub const REFERENCE_CACHE_TTL_SECS: u64 = 1800;

/// Key prefix / tag scope for search pages.
pub const SEARCH_SCOPE: &str = "events:search";

/// Key prefix / tag scope for stats.
pub const STATS_SCOPE: &str = "events:stats";

/// Key prefix for single-event entries.
pub const EVENT_KEY_PREFIX: &str = "event";

/// Keys for the reference lists.
pub const SUBJECTS_LIST_KEY: &str = "events:subjects";
pub const CATEGORIES_LIST_KEY: &str = "events:categories";
pub const URLS_LIST_KEY: &str = "events:urls";

/// Cross-cutting tags.
pub const TAG_SEARCH: &str = "search";
pub const TAG_DATE_RANGE: &str = "date-range";
pub const TAG_METADATA: &str = "metadata";
pub const TAG_SUBJECTS: &str = "subjects";
pub const TAG_CATEGORIES: &str = "categories";
pub const TAG_URLS: &str = "urls";

/// Capacity of the realtime broadcast channel.
pub const NOTIFIER_CAPACITY: usize = 1000;
