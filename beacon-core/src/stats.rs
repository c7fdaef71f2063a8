//! Aggregate statistics shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A message value and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCount {
    pub message: String,
    pub count: u64,
}

/// Event count for one calendar day (UTC), `date` formatted `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

/// Aggregate statistics over a (possibly filtered) event set.
///
/// Maps are BTreeMaps so that serialized payloads are deterministic; two
/// identical stats computations produce byte-identical cache entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStats {
    pub total_count: u64,
    pub count_by_category: BTreeMap<String, u64>,
    pub count_by_url: BTreeMap<String, u64>,
    /// Most frequent message values, at most five, highest count first.
    pub top_messages: Vec<MessageCount>,
    /// Daily histogram over the filtered window, ascending by date.
    pub counts_over_time: Vec<DailyCount>,
    pub unique_subjects: u64,
    /// `total_count / unique_subjects`, or 0 when there are no subjects.
    pub average_per_subject: f64,
}

impl EventStats {
    /// Stats for an empty result set.
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            count_by_category: BTreeMap::new(),
            count_by_url: BTreeMap::new(),
            top_messages: Vec::new(),
            counts_over_time: Vec::new(),
            unique_subjects: 0,
            average_per_subject: 0.0,
        }
    }

    /// Recompute the average from the current totals.
    pub fn with_average(mut self) -> Self {
        self.average_per_subject = if self.unique_subjects > 0 {
            self.total_count as f64 / self.unique_subjects as f64
        } else {
            0.0
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_per_subject() {
        let stats = EventStats {
            total_count: 3,
            unique_subjects: 2,
            ..EventStats::empty()
        }
        .with_average();
        assert!((stats.average_per_subject - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_with_no_subjects_is_zero() {
        let stats = EventStats {
            total_count: 5,
            unique_subjects: 0,
            ..EventStats::empty()
        }
        .with_average();
        assert_eq!(stats.average_per_subject, 0.0);
    }

    #[test]
    fn test_stats_serialization_is_deterministic() {
        let mut by_category = BTreeMap::new();
        by_category.insert("Firefox".to_string(), 1);
        by_category.insert("Chrome".to_string(), 2);

        let stats = EventStats {
            total_count: 3,
            count_by_category: by_category,
            unique_subjects: 2,
            ..EventStats::empty()
        }
        .with_average();

        let a = serde_json::to_string(&stats).unwrap();
        let b = serde_json::to_string(&stats.clone()).unwrap();
        assert_eq!(a, b);
        // BTreeMap keys serialize sorted
        assert!(a.find("Chrome").unwrap() < a.find("Firefox").unwrap());
    }
}
