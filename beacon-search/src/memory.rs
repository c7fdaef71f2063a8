//! In-memory search engine.
//!
//! Interprets the structured query model the way the production engine
//! would: filter clauses gate without scoring, the multi-match clause does
//! tokenized fuzzy matching with per-field boosts, and stats queries run
//! the shared aggregation over the gated document set.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use beacon_core::{EventId, SearchError, SortDirection, SortField};

use crate::aggregate::{aggregate, StatsRow};
use crate::engine::{SearchDocument, SearchEngine, SearchResponse, StatsAggregations};
use crate::query::{BoolQuery, BoostedField, Clause, SearchQuery, StatsQuery, TextField};

/// Edit-distance budget per token length, mirroring the production
/// engine's AUTO fuzziness: exact under 3 chars, 1 edit up to 5, 2 beyond.
fn fuzziness_for(len: usize) -> usize {
    match len {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Bounded Levenshtein distance; bails out early once `max` is exceeded.
fn within_edit_distance(a: &str, b: &str, max: usize) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return false;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        let mut row_min = current[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(current[j] + 1);
            row_min = row_min.min(current[j + 1]);
        }
        if row_min > max {
            return false;
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()] <= max
}

fn token_matches(query_token: &str, doc_token: &str) -> bool {
    if doc_token.contains(query_token) {
        return true;
    }
    within_edit_distance(query_token, doc_token, fuzziness_for(query_token.len()))
}

fn field_text<'a>(doc: &'a SearchDocument, field: TextField) -> &'a str {
    match field {
        TextField::Message => &doc.message,
        TextField::Trace => &doc.trace,
        TextField::SubjectId => &doc.subject_id,
        TextField::Category => &doc.category,
        TextField::SourceUrl => &doc.source_url,
    }
}

/// Score a multi-match clause against one document. `None` means the clause
/// does not match at all.
fn multi_match_score(doc: &SearchDocument, query: &str, fields: &[BoostedField]) -> Option<f32> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return Some(0.0);
    }

    let mut score = 0.0f32;
    let mut matched = false;
    for boosted in fields {
        let doc_tokens = tokenize(field_text(doc, boosted.field));
        let hits = query_tokens
            .iter()
            .filter(|qt| doc_tokens.iter().any(|dt| token_matches(qt, dt)))
            .count();
        if hits > 0 {
            matched = true;
            score += boosted.boost * hits as f32;
        }
    }
    matched.then_some(score)
}

/// Evaluate a document against a bool query, returning its score when it
/// matches.
fn evaluate(doc: &SearchDocument, query: &BoolQuery) -> Option<f32> {
    for clause in &query.filter {
        let ok = match clause {
            Clause::TimestampRange { start, end } => {
                doc.timestamp >= *start && doc.timestamp <= *end
            }
            Clause::Term { field, value } => match field {
                crate::query::TermField::SubjectId => &doc.subject_id == value,
                crate::query::TermField::Category => &doc.category == value,
            },
            Clause::UrlMatch { value } => {
                doc.source_url == *value
                    || doc
                        .source_url
                        .to_lowercase()
                        .contains(&value.to_lowercase())
            }
            // multi-match only appears in must clauses
            Clause::MultiMatch { .. } => true,
        };
        if !ok {
            return None;
        }
    }

    let mut score = 0.0f32;
    for clause in &query.must {
        match clause {
            Clause::MultiMatch { query, fields } => {
                score += multi_match_score(doc, query, fields)?;
            }
            // structured clauses in must gate without scoring
            Clause::TimestampRange { start, end } => {
                if doc.timestamp < *start || doc.timestamp > *end {
                    return None;
                }
            }
            Clause::Term { field, value } => {
                let ok = match field {
                    crate::query::TermField::SubjectId => &doc.subject_id == value,
                    crate::query::TermField::Category => &doc.category == value,
                };
                if !ok {
                    return None;
                }
            }
            Clause::UrlMatch { value } => {
                if !doc
                    .source_url
                    .to_lowercase()
                    .contains(&value.to_lowercase())
                {
                    return None;
                }
            }
        }
    }
    Some(score)
}

/// In-memory search engine.
#[derive(Debug, Default)]
pub struct InMemorySearchEngine {
    docs: RwLock<HashMap<EventId, SearchDocument>>,
    index_ready: AtomicBool,
    fail: AtomicBool,
    search_calls: AtomicU64,
    stats_calls: AtomicU64,
}

impl InMemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an engine outage: every call returns
    /// `SearchError::Unavailable` until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of indexed documents.
    pub fn doc_count(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    /// How many search queries have reached the engine.
    pub fn search_count(&self) -> u64 {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// How many stats queries have reached the engine.
    pub fn stats_count(&self) -> u64 {
        self.stats_calls.load(Ordering::SeqCst)
    }

    /// Whether `ensure_index` has run.
    pub fn is_index_ready(&self) -> bool {
        self.index_ready.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), SearchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SearchError::Unavailable {
                reason: "simulated outage".to_string(),
            });
        }
        Ok(())
    }

    fn matched_docs(&self, query: &BoolQuery) -> Result<Vec<(SearchDocument, f32)>, SearchError> {
        let docs = self.docs.read().map_err(|_| SearchError::Unavailable {
            reason: "index lock poisoned".to_string(),
        })?;
        Ok(docs
            .values()
            .filter_map(|doc| evaluate(doc, query).map(|score| (doc.clone(), score)))
            .collect())
    }
}

#[async_trait]
impl SearchEngine for InMemorySearchEngine {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        self.check_available()?;
        self.index_ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn index_document(&self, doc: SearchDocument) -> Result<(), SearchError> {
        self.check_available()?;

        let mut docs = self.docs.write().map_err(|_| SearchError::IndexFailed {
            id: doc.id,
            reason: "index lock poisoned".to_string(),
        })?;
        docs.insert(doc.id, doc);
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        self.check_available()?;
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();

        let mut matched = self.matched_docs(&query.bool_query)?;
        let scored = !query.bool_query.must.is_empty();

        matched.sort_by(|(a, score_a), (b, score_b)| {
            if scored {
                // relevance first, requested sort as tie-break
                if let Some(ord) = score_b.partial_cmp(score_a) {
                    if ord != std::cmp::Ordering::Equal {
                        return ord;
                    }
                }
            }
            let ordering = match query.sort_field {
                SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::SubjectId => a.subject_id.cmp(&b.subject_id),
                SortField::Category => a.category.cmp(&b.category),
            };
            match query.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(query.from)
            .take(query.size)
            .map(|(doc, _)| doc)
            .collect();

        Ok(SearchResponse {
            hits,
            total,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn stats(&self, query: &StatsQuery) -> Result<StatsAggregations, SearchError> {
        self.check_available()?;
        self.stats_calls.fetch_add(1, Ordering::SeqCst);

        let matched = self.matched_docs(&query.bool_query)?;
        Ok(aggregate(matched.iter().map(|(doc, _)| StatsRow {
            subject_id: &doc.subject_id,
            category: &doc.category,
            source_url: &doc.source_url,
            message: &doc.message,
            timestamp: doc.timestamp,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{build_search_query, build_stats_query};
    use beacon_core::{new_event_id, Event, SearchFilters};
    use chrono::{Duration, Utc};

    fn doc(subject: &str, category: &str, message: &str) -> SearchDocument {
        let now = Utc::now();
        SearchDocument::from(&Event {
            id: new_event_id(),
            timestamp: now - Duration::minutes(1),
            subject_id: subject.to_string(),
            category: category.to_string(),
            source_url: format!("https://example.com/{}", subject),
            message: message.to_string(),
            trace: "at app.js:1".to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn engine_with(docs: Vec<SearchDocument>) -> InMemorySearchEngine {
        let engine = InMemorySearchEngine::new();
        engine.ensure_index().await.unwrap();
        assert!(engine.is_index_ready());
        for d in docs {
            engine.index_document(d).await.unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_match_all_on_empty_filters() {
        let engine = engine_with(vec![
            doc("u1", "Chrome", "boom"),
            doc("u2", "Firefox", "crash"),
        ])
        .await;

        let response = engine
            .search(&build_search_query(&SearchFilters::default()))
            .await
            .unwrap();
        assert_eq!(response.total, 2);
    }

    #[tokio::test]
    async fn test_term_filter_gates_without_scoring() {
        let engine = engine_with(vec![
            doc("u1", "Chrome", "boom"),
            doc("u2", "Firefox", "crash"),
        ])
        .await;

        let filters = SearchFilters {
            category: Some("Chrome".to_string()),
            ..Default::default()
        };
        let response = engine.search(&build_search_query(&filters)).await.unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.hits[0].category, "Chrome");
    }

    #[tokio::test]
    async fn test_free_text_fuzzy_match() {
        let engine = engine_with(vec![
            doc("u1", "Chrome", "TypeError: x is undefined"),
            doc("u2", "Chrome", "quota exceeded"),
        ])
        .await;

        // one edit away from "TypeError"
        let filters = SearchFilters {
            free_text: Some("TypeEror".to_string()),
            ..Default::default()
        };
        let response = engine.search(&build_search_query(&filters)).await.unwrap();
        assert_eq!(response.total, 1);
        assert!(response.hits[0].message.starts_with("TypeError"));
    }

    #[tokio::test]
    async fn test_message_boost_ranks_message_hits_first() {
        let mut trace_hit = doc("u1", "Chrome", "something else");
        trace_hit.trace = "timeout at poll".to_string();
        let message_hit = doc("u2", "Chrome", "timeout waiting for frame");

        let engine = engine_with(vec![trace_hit, message_hit]).await;
        let filters = SearchFilters {
            free_text: Some("timeout".to_string()),
            ..Default::default()
        };
        let response = engine.search(&build_search_query(&filters)).await.unwrap();

        assert_eq!(response.total, 2);
        assert_eq!(response.hits[0].subject_id, "u2");
    }

    #[tokio::test]
    async fn test_url_substring_filter() {
        let engine = engine_with(vec![
            doc("checkout", "Chrome", "boom"),
            doc("landing", "Chrome", "boom"),
        ])
        .await;

        let filters = SearchFilters {
            url_substring: Some("CHECKOUT".to_string()),
            ..Default::default()
        };
        let response = engine.search(&build_search_query(&filters)).await.unwrap();
        assert_eq!(response.total, 1);
    }

    #[tokio::test]
    async fn test_pagination_window() {
        let docs: Vec<SearchDocument> = (0..5)
            .map(|i| {
                let mut d = doc("u", "Chrome", &format!("m{}", i));
                d.timestamp = Utc::now() - Duration::minutes(10 - i);
                d
            })
            .collect();
        let engine = engine_with(docs).await;

        let filters = SearchFilters {
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let response = engine.search(&build_search_query(&filters)).await.unwrap();
        assert_eq!(response.total, 5);
        assert_eq!(response.hits.len(), 2);
        assert_eq!(response.hits[0].message, "m2");
    }

    #[tokio::test]
    async fn test_stats_aggregations() {
        let engine = engine_with(vec![
            doc("u1", "Chrome", "boom"),
            doc("u2", "Chrome", "boom"),
            doc("u1", "Firefox", "crash"),
        ])
        .await;

        let aggs = engine
            .stats(&build_stats_query(&SearchFilters::default()))
            .await
            .unwrap();
        assert_eq!(aggs.total, 3);
        assert_eq!(aggs.unique_subjects, 2);
        assert_eq!(aggs.by_category[0].key, "Chrome");
        assert_eq!(aggs.by_category[0].count, 2);
    }

    #[tokio::test]
    async fn test_outage_toggle() {
        let engine = InMemorySearchEngine::new();
        engine.set_failing(true);
        let err = engine
            .search(&build_search_query(&SearchFilters::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Unavailable { .. }));
    }

    #[test]
    fn test_edit_distance_bounds() {
        assert!(within_edit_distance("typeerror", "typeeror", 2));
        assert!(!within_edit_distance("timeout", "typeerror", 2));
        assert!(within_edit_distance("abc", "abc", 0));
    }
}
