//! The event service.
//!
//! Write path: validate, insert into the primary store (synchronous,
//! authoritative), then fire detached background tasks for indexing, bus
//! publishing, and cache invalidation. Each detached task carries its own
//! error-logging boundary; an event may be durable before it is
//! searchable, cache-consistent, or broadcast, and that window is part of
//! the contract.
//!
//! Read paths are cache-aside: check the tagged cache, fall through to the
//! search adapter or store on a miss, populate the cache, return. A cache
//! failure is logged and treated like a miss; it never fails the request.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use beacon_core::{
    BeaconError, BeaconResult, Event, EventId, EventStats, NewEvent, PageResult, SearchFilters,
};
use beacon_ingest::{EventProducer, EventType, HandlerRegistry, IngestHandler};
use beacon_search::SearchIndexAdapter;
use beacon_storage::{CacheWriteOptions, DistinctField, EventStore, TaggedCache};

use crate::cache_keys::{derive_key, derive_tags, filter_params};
use crate::config::CachePolicy;
use crate::constants::{
    CATEGORIES_LIST_KEY, EVENT_KEY_PREFIX, SEARCH_SCOPE, STATS_SCOPE, SUBJECTS_LIST_KEY,
    TAG_CATEGORIES, TAG_DATE_RANGE, TAG_METADATA, TAG_SEARCH, TAG_SUBJECTS, TAG_URLS,
    URLS_LIST_KEY,
};
use crate::notify::{Notifier, ServiceEvent};

/// Orchestrates event operations across the injected collaborators.
pub struct EventService {
    store: Arc<dyn EventStore>,
    search: SearchIndexAdapter,
    cache: TaggedCache,
    producer: Arc<EventProducer>,
    notifier: Notifier,
    policy: CachePolicy,
}

impl EventService {
    pub fn new(
        store: Arc<dyn EventStore>,
        search: SearchIndexAdapter,
        cache: TaggedCache,
        producer: Arc<EventProducer>,
        notifier: Notifier,
        policy: CachePolicy,
    ) -> Self {
        Self {
            store,
            search,
            cache,
            producer,
            notifier,
            policy,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Build the handler registry wiring bus-delivered creates back into
    /// this service.
    pub fn ingest_registry(service: Arc<EventService>) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(EventType::ErrorEvent, Arc::new(BusCreateHandler { service }));
        registry
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Create an event from a direct caller. Publishes to the bus in
    /// addition to the other post-write side effects.
    pub async fn create(&self, draft: NewEvent) -> BeaconResult<Event> {
        self.create_with(draft, true).await
    }

    /// Create an event arriving over the bus. Identical to [`create`]
    /// except the bus publish is skipped, so a consumed message cannot
    /// re-enter the pipeline.
    ///
    /// [`create`]: EventService::create
    pub async fn create_from_bus(&self, draft: NewEvent) -> BeaconResult<Event> {
        self.create_with(draft, false).await
    }

    async fn create_with(&self, draft: NewEvent, publish: bool) -> BeaconResult<Event> {
        draft.validate()?;

        let event = self.store.insert(draft.clone()).await?;
        info!(event_id = %event.id, subject_id = %event.subject_id, "event created");

        // Detached side effects. None of these are awaited by the caller;
        // failures are logged, never raised.
        let search = self.search.clone();
        let to_index = event.clone();
        tokio::spawn(async move {
            if let Err(e) = search.index_event(&to_index).await {
                warn!(event_id = %to_index.id, error = %e, "failed to index event, not retried");
            }
        });

        self.notifier
            .broadcast(ServiceEvent::EventCreated { event: event.clone() });

        if publish {
            let producer = self.producer.clone();
            let event_id = event.id;
            tokio::spawn(async move {
                if let Err(e) = producer.publish_event(event_id, &draft).await {
                    warn!(event_id = %event_id, error = %e, "failed to publish event to bus");
                }
            });
        }

        let cache = self.cache.clone();
        let created = event.clone();
        tokio::spawn(Self::invalidate_after_create(cache, created));

        Ok(event)
    }

    /// Drop every cache entry the new event could have made stale: the
    /// subject and category scopes, all search pages and stats, and any
    /// reference list that does not yet contain one of the event's values.
    async fn invalidate_after_create(cache: TaggedCache, event: Event) {
        let mut tags = vec![
            format!("subject:{}", event.subject_id),
            format!("category:{}", event.category),
            TAG_SEARCH.to_string(),
            SEARCH_SCOPE.to_string(),
            STATS_SCOPE.to_string(),
            TAG_DATE_RANGE.to_string(),
        ];

        let reference_lists = [
            (SUBJECTS_LIST_KEY, TAG_SUBJECTS, &event.subject_id),
            (CATEGORIES_LIST_KEY, TAG_CATEGORIES, &event.category),
            (URLS_LIST_KEY, TAG_URLS, &event.source_url),
        ];
        for (key, tag, value) in reference_lists {
            match cache.get::<Vec<String>>(key).await {
                Ok(outcome) => {
                    if let Some(list) = outcome.into_value() {
                        if !list.contains(value) {
                            tags.push(tag.to_string());
                        }
                    }
                }
                Err(e) => {
                    warn!(key, error = %e, "reference list check failed during invalidation");
                }
            }
        }

        match cache.invalidate_tags(&tags).await {
            Ok(result) => {
                debug!(
                    event_id = %event.id,
                    invalidated = result.invalidated_count,
                    "post-create cache invalidation"
                );
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "post-create cache invalidation failed");
            }
        }
    }

    // ========================================================================
    // READ PATHS
    // ========================================================================

    /// Fetch one event by id, cache-aside. Absence is a typed failure and
    /// is never cached.
    pub async fn get_by_id(&self, id: EventId) -> BeaconResult<Event> {
        let key = format!("{}:{}", EVENT_KEY_PREFIX, id);
        if let Some(event) = self.cache_read::<Event>(&key).await {
            return Ok(event);
        }

        match self.store.find_by_id(id).await? {
            Some(event) => {
                self.cache_write(&key, &event, self.policy.event_ttl, Vec::new())
                    .await;
                Ok(event)
            }
            None => Err(BeaconError::not_found(id)),
        }
    }

    /// Paged search, cache-aside over the fallback-capable adapter.
    pub async fn search(&self, filters: &SearchFilters) -> BeaconResult<PageResult<Event>> {
        let filters = filters.clone().normalized();
        let key = derive_key(SEARCH_SCOPE, &filter_params(&filters));
        if let Some(page) = self.cache_read::<PageResult<Event>>(&key).await {
            return Ok(page);
        }

        let page = self.search.search(&filters).await?;
        self.cache_write(
            &key,
            &page,
            self.policy.search_ttl,
            derive_tags(SEARCH_SCOPE, &filters),
        )
        .await;
        Ok(page)
    }

    /// Aggregate stats, cache-aside over the fallback-capable adapter.
    pub async fn stats(&self, filters: &SearchFilters) -> BeaconResult<EventStats> {
        let filters = filters.clone().normalized();
        let key = derive_key(STATS_SCOPE, &filter_params(&filters));
        if let Some(stats) = self.cache_read::<EventStats>(&key).await {
            return Ok(stats);
        }

        let stats = self.search.stats(&filters).await?;
        self.cache_write(
            &key,
            &stats,
            self.policy.stats_ttl,
            derive_tags(STATS_SCOPE, &filters),
        )
        .await;
        Ok(stats)
    }

    /// Distinct subjects, long-TTL cache-aside.
    pub async fn subjects(&self) -> BeaconResult<Vec<String>> {
        self.reference_list(SUBJECTS_LIST_KEY, TAG_SUBJECTS, DistinctField::SubjectId)
            .await
    }

    /// Distinct categories, long-TTL cache-aside.
    pub async fn categories(&self) -> BeaconResult<Vec<String>> {
        self.reference_list(CATEGORIES_LIST_KEY, TAG_CATEGORIES, DistinctField::Category)
            .await
    }

    /// Distinct source URLs, long-TTL cache-aside.
    pub async fn source_urls(&self) -> BeaconResult<Vec<String>> {
        self.reference_list(URLS_LIST_KEY, TAG_URLS, DistinctField::SourceUrl)
            .await
    }

    async fn reference_list(
        &self,
        key: &str,
        tag: &str,
        field: DistinctField,
    ) -> BeaconResult<Vec<String>> {
        if let Some(list) = self.cache_read::<Vec<String>>(key).await {
            return Ok(list);
        }

        let list = self.store.distinct(field).await?;
        self.cache_write(
            key,
            &list,
            self.policy.reference_ttl,
            vec![tag.to_string(), TAG_METADATA.to_string()],
        )
        .await;
        Ok(list)
    }

    // ========================================================================
    // CACHE HELPERS
    // ========================================================================

    /// Read the cache, treating I/O failure as a logged miss. The miss path
    /// and the degraded path both fall through to the source of truth; only
    /// the log level differs.
    async fn cache_read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get::<T>(key).await {
            Ok(outcome) => {
                let hit = outcome.is_hit();
                debug!(key, hit, "cache lookup");
                outcome.into_value()
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, falling through to source");
                None
            }
        }
    }

    async fn cache_write<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        tags: Vec<String>,
    ) {
        if let Err(e) = self
            .cache
            .set(key, value, CacheWriteOptions::new(ttl, tags))
            .await
        {
            warn!(key, error = %e, "cache write failed");
        }
    }
}

/// Bus handler that routes consumed create requests into the service.
pub struct BusCreateHandler {
    service: Arc<EventService>,
}

impl BusCreateHandler {
    pub fn new(service: Arc<EventService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl IngestHandler for BusCreateHandler {
    async fn handle(&self, draft: NewEvent) -> BeaconResult<()> {
        self.service.create_from_bus(draft).await.map(|_| ())
    }
}
