//! Structured query model.
//!
//! Queries are plain data so the engine contract stays serializable and the
//! in-memory engine can interpret exactly what a networked engine would
//! receive. Range and exact-match filters are non-scoring `filter` clauses;
//! free text becomes a scoring `must` clause with weighted multi-field
//! fuzzy matching.

use serde::{Deserialize, Serialize};

use beacon_core::{SearchFilters, SortDirection, SortField, Timestamp};

/// Boost applied to the message field in free-text matching.
const MESSAGE_BOOST: f32 = 2.0;

/// Text fields participating in free-text matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Message,
    Trace,
    SubjectId,
    Category,
    SourceUrl,
}

/// Exact-match fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermField {
    SubjectId,
    Category,
}

/// A text field with its scoring weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostedField {
    pub field: TextField,
    pub boost: f32,
}

/// One boolean clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Inclusive timestamp window.
    TimestampRange { start: Timestamp, end: Timestamp },
    /// Exact match on a keyword field.
    Term { field: TermField, value: String },
    /// URL match: exact value, substring, or analyzed-text match - any of
    /// the three satisfies the clause.
    UrlMatch { value: String },
    /// Weighted fuzzy match across text fields.
    MultiMatch {
        query: String,
        fields: Vec<BoostedField>,
    },
}

/// Boolean query: `filter` clauses gate without scoring, `must` clauses
/// gate and score. Both empty means match-all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub must: Vec<Clause>,
    pub filter: Vec<Clause>,
}

impl BoolQuery {
    pub fn is_match_all(&self) -> bool {
        self.must.is_empty() && self.filter.is_empty()
    }
}

/// A paged, sorted search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub bool_query: BoolQuery,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub from: usize,
    pub size: usize,
}

/// An aggregation-only query: same boolean gating, no hits returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsQuery {
    pub bool_query: BoolQuery,
}

/// The standard free-text field set, weighted toward the message.
fn multi_match_fields() -> Vec<BoostedField> {
    vec![
        BoostedField {
            field: TextField::Message,
            boost: MESSAGE_BOOST,
        },
        BoostedField {
            field: TextField::Trace,
            boost: 1.0,
        },
        BoostedField {
            field: TextField::SubjectId,
            boost: 1.0,
        },
        BoostedField {
            field: TextField::Category,
            boost: 1.0,
        },
        BoostedField {
            field: TextField::SourceUrl,
            boost: 1.0,
        },
    ]
}

fn bool_query_from(filters: &SearchFilters) -> BoolQuery {
    let mut query = BoolQuery::default();

    if let Some(range) = &filters.date_range {
        query.filter.push(Clause::TimestampRange {
            start: range.start,
            end: range.end,
        });
    }
    if let Some(subject) = &filters.subject_id {
        query.filter.push(Clause::Term {
            field: TermField::SubjectId,
            value: subject.clone(),
        });
    }
    if let Some(category) = &filters.category {
        query.filter.push(Clause::Term {
            field: TermField::Category,
            value: category.clone(),
        });
    }
    if let Some(fragment) = &filters.url_substring {
        query.filter.push(Clause::UrlMatch {
            value: fragment.clone(),
        });
    }
    if let Some(text) = &filters.free_text {
        query.must.push(Clause::MultiMatch {
            query: text.clone(),
            fields: multi_match_fields(),
        });
    }

    query
}

/// Build a paged search query from the filter set.
pub fn build_search_query(filters: &SearchFilters) -> SearchQuery {
    let filters = filters.clone().normalized();
    SearchQuery {
        bool_query: bool_query_from(&filters),
        sort_field: filters.sort_field,
        sort_direction: filters.sort_direction,
        from: filters.offset(),
        size: filters.page_size as usize,
    }
}

/// Build an aggregation query from the filter set (paging ignored).
pub fn build_stats_query(filters: &SearchFilters) -> StatsQuery {
    StatsQuery {
        bool_query: bool_query_from(filters),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::DateRange;
    use chrono::{Duration, Utc};

    #[test]
    fn test_empty_filters_build_match_all() {
        let query = build_search_query(&SearchFilters::default());
        assert!(query.bool_query.is_match_all());
        assert_eq!(query.from, 0);
        assert_eq!(query.size, 20);
        assert_eq!(query.sort_field, SortField::Timestamp);
        assert_eq!(query.sort_direction, SortDirection::Desc);
    }

    #[test]
    fn test_structured_filters_become_filter_clauses() {
        let filters = SearchFilters {
            date_range: Some(DateRange::new(Utc::now() - Duration::days(1), Utc::now())),
            subject_id: Some("u1".to_string()),
            category: Some("Chrome".to_string()),
            url_substring: Some("checkout".to_string()),
            ..Default::default()
        };
        let query = build_search_query(&filters);

        assert_eq!(query.bool_query.filter.len(), 4);
        assert!(query.bool_query.must.is_empty());
    }

    #[test]
    fn test_free_text_becomes_weighted_must_clause() {
        let filters = SearchFilters {
            free_text: Some("TypeError".to_string()),
            ..Default::default()
        };
        let query = build_search_query(&filters);

        assert_eq!(query.bool_query.must.len(), 1);
        match &query.bool_query.must[0] {
            Clause::MultiMatch { query, fields } => {
                assert_eq!(query, "TypeError");
                let message = fields
                    .iter()
                    .find(|f| f.field == TextField::Message)
                    .unwrap();
                assert!(message.boost > 1.0);
            }
            other => panic!("expected MultiMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_pagination_offset() {
        let filters = SearchFilters {
            page: 3,
            page_size: 10,
            ..Default::default()
        };
        let query = build_search_query(&filters);
        assert_eq!(query.from, 20);
        assert_eq!(query.size, 10);
    }

    #[test]
    fn test_stats_query_keeps_free_text_gate() {
        let filters = SearchFilters {
            free_text: Some("boom".to_string()),
            category: Some("Chrome".to_string()),
            ..Default::default()
        };
        let query = build_stats_query(&filters);
        assert_eq!(query.bool_query.must.len(), 1);
        assert_eq!(query.bool_query.filter.len(), 1);
    }
}
