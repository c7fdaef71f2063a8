//! Search adapter with primary-store fallback.
//!
//! Availability beats ranking fidelity here: any engine failure is logged
//! as a single warning and the same logical query is re-issued against the
//! primary store's native filtered pagination. The two paths do not produce
//! identical ranking for free-text queries (the store cannot fuzzy-rank);
//! that divergence is the accepted cost.

use std::sync::Arc;
use tracing::{debug, warn};

use beacon_core::{
    BeaconResult, DailyCount, Event, EventStats, MessageCount, PageResult, SearchError,
    SearchFilters,
};
use beacon_storage::EventStore;

use crate::aggregate::{aggregate, StatsRow};
use crate::engine::{SearchDocument, SearchEngine, StatsAggregations};
use crate::query::{build_search_query, build_stats_query};

/// Upper bound on primary-store rows scanned by the stats fallback.
const MAX_STATS_SCAN: u32 = 10_000;

/// Composes the search engine with the primary store fallback.
#[derive(Clone)]
pub struct SearchIndexAdapter {
    engine: Arc<dyn SearchEngine>,
    store: Arc<dyn EventStore>,
}

impl SearchIndexAdapter {
    pub fn new(engine: Arc<dyn SearchEngine>, store: Arc<dyn EventStore>) -> Self {
        Self { engine, store }
    }

    /// Create the index if needed. Callers treat failure as a degraded
    /// start, not a fatal one.
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        self.engine.ensure_index().await
    }

    /// Project and index one event. Best-effort: a failure is returned for
    /// the caller's logging boundary and never retried here.
    pub async fn index_event(&self, event: &Event) -> Result<(), SearchError> {
        self.engine.index_document(SearchDocument::from(event)).await
    }

    /// Paged search with transparent fallback.
    pub async fn search(&self, filters: &SearchFilters) -> BeaconResult<PageResult<Event>> {
        let filters = filters.clone().normalized();
        let query = build_search_query(&filters);

        match self.engine.search(&query).await {
            Ok(response) => {
                debug!(total = response.total, took_ms = response.took_ms, "search engine query");
                let items: Vec<Event> =
                    response.hits.into_iter().map(SearchDocument::into_event).collect();
                Ok(PageResult::new(
                    items,
                    response.total,
                    filters.page,
                    filters.page_size,
                ))
            }
            Err(e) => {
                warn!(error = %e, "search engine query failed, falling back to primary store");
                Ok(self.store.find_paged(&filters).await?)
            }
        }
    }

    /// Aggregate stats with transparent fallback.
    pub async fn stats(&self, filters: &SearchFilters) -> BeaconResult<EventStats> {
        let query = build_stats_query(filters);

        match self.engine.stats(&query).await {
            Ok(aggs) => Ok(to_event_stats(aggs)),
            Err(e) => {
                warn!(error = %e, "search engine stats failed, falling back to primary store");
                self.stats_from_store(filters).await
            }
        }
    }

    /// Recompute the aggregates from the primary store, bounded by
    /// `MAX_STATS_SCAN` rows.
    async fn stats_from_store(&self, filters: &SearchFilters) -> BeaconResult<EventStats> {
        let scan = SearchFilters {
            page: 1,
            page_size: MAX_STATS_SCAN,
            ..filters.clone()
        };
        let page = self.store.find_paged(&scan).await?;
        if page.total > MAX_STATS_SCAN as u64 {
            warn!(
                total = page.total,
                scanned = MAX_STATS_SCAN,
                "stats fallback truncated the scanned event set"
            );
        }

        let aggs = aggregate(page.items.iter().map(|e| StatsRow {
            subject_id: &e.subject_id,
            category: &e.category,
            source_url: &e.source_url,
            message: &e.message,
            timestamp: e.timestamp,
        }));
        Ok(to_event_stats(aggs))
    }
}

fn to_event_stats(aggs: StatsAggregations) -> EventStats {
    EventStats {
        total_count: aggs.total,
        count_by_category: aggs
            .by_category
            .into_iter()
            .map(|b| (b.key, b.count))
            .collect(),
        count_by_url: aggs.by_url.into_iter().map(|b| (b.key, b.count)).collect(),
        top_messages: aggs
            .top_messages
            .into_iter()
            .map(|b| MessageCount {
                message: b.key,
                count: b.count,
            })
            .collect(),
        counts_over_time: aggs
            .over_time
            .into_iter()
            .map(|b| DailyCount {
                date: b.key,
                count: b.count,
            })
            .collect(),
        unique_subjects: aggs.unique_subjects,
        average_per_subject: 0.0,
    }
    .with_average()
}
