//! Aggregation shared by the in-memory engine and the primary-store
//! fallback path, so both sides of the fallback produce identical shapes.

use std::collections::{BTreeMap, HashMap};

use beacon_core::Timestamp;

use crate::engine::{StatsAggregations, TermsBucket};

/// Bucket sizes mirror the production aggregation request.
const TOP_TERMS: usize = 10;
const TOP_MESSAGES: usize = 5;

/// The fields aggregation needs from one event/document.
#[derive(Debug, Clone, Copy)]
pub struct StatsRow<'a> {
    pub subject_id: &'a str,
    pub category: &'a str,
    pub source_url: &'a str,
    pub message: &'a str,
    pub timestamp: Timestamp,
}

fn top_buckets(counts: HashMap<&str, u64>, limit: usize) -> Vec<TermsBucket> {
    let mut buckets: Vec<TermsBucket> = counts
        .into_iter()
        .map(|(key, count)| TermsBucket {
            key: key.to_string(),
            count,
        })
        .collect();
    // count-descending, key-ascending for a stable order
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    buckets.truncate(limit);
    buckets
}

/// Compute the full aggregation set over a row iterator.
pub fn aggregate<'a>(rows: impl Iterator<Item = StatsRow<'a>>) -> StatsAggregations {
    let mut total = 0u64;
    let mut subjects: HashMap<&str, u64> = HashMap::new();
    let mut categories: HashMap<&str, u64> = HashMap::new();
    let mut urls: HashMap<&str, u64> = HashMap::new();
    let mut messages: HashMap<&str, u64> = HashMap::new();
    let mut days: BTreeMap<String, u64> = BTreeMap::new();

    for row in rows {
        total += 1;
        *subjects.entry(row.subject_id).or_default() += 1;
        *categories.entry(row.category).or_default() += 1;
        *urls.entry(row.source_url).or_default() += 1;
        *messages.entry(row.message).or_default() += 1;
        *days
            .entry(row.timestamp.format("%Y-%m-%d").to_string())
            .or_default() += 1;
    }

    StatsAggregations {
        total,
        unique_subjects: subjects.len() as u64,
        by_category: top_buckets(categories, TOP_TERMS),
        by_url: top_buckets(urls, TOP_TERMS),
        top_messages: top_buckets(messages, TOP_MESSAGES),
        over_time: days
            .into_iter()
            .map(|(key, count)| TermsBucket { key, count })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_aggregate_counts_and_cardinality() {
        let now = Utc::now();
        let rows = vec![
            ("u1", "Chrome", "https://a", "boom", now),
            ("u2", "Chrome", "https://a", "boom", now),
            ("u1", "Firefox", "https://b", "crash", now - Duration::days(1)),
        ];
        let aggs = aggregate(rows.iter().map(|(s, c, u, m, t)| StatsRow {
            subject_id: s,
            category: c,
            source_url: u,
            message: m,
            timestamp: *t,
        }));

        assert_eq!(aggs.total, 3);
        assert_eq!(aggs.unique_subjects, 2);
        assert_eq!(aggs.by_category[0].key, "Chrome");
        assert_eq!(aggs.by_category[0].count, 2);
        assert_eq!(aggs.top_messages[0].key, "boom");
        assert_eq!(aggs.over_time.len(), 2);
        // daily histogram is date-ascending
        assert!(aggs.over_time[0].key < aggs.over_time[1].key);
    }

    #[test]
    fn test_top_messages_capped_at_five() {
        let now = Utc::now();
        let messages: Vec<String> = (0..8).map(|i| format!("m{}", i)).collect();
        let aggs = aggregate(messages.iter().map(|m| StatsRow {
            subject_id: "u",
            category: "c",
            source_url: "https://x",
            message: m,
            timestamp: now,
        }));
        assert_eq!(aggs.top_messages.len(), 5);
    }
}
