//! Primary store trait and in-memory implementation.
//!
//! The in-memory store mirrors what the production document store provides
//! at its interface boundary: create, fetch by id, filtered pagination, and
//! distinct-value listing. Filtered pagination here is the "native" query
//! capability the search fallback path relies on: exact matches, range
//! matches, and plain substring matching - no fuzzy ranking.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use beacon_core::{
    new_event_id, Event, EventId, NewEvent, PageResult, SearchFilters, SortDirection, SortField,
    StoreError,
};

/// Fields that support distinct-value listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistinctField {
    SubjectId,
    Category,
    SourceUrl,
}

/// Primary store contract for event records.
///
/// Implementations must be safe for concurrent use through a shared handle;
/// every method is an I/O boundary where the caller may suspend.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a draft, assigning id and created/updated timestamps.
    /// Returns the canonical event as stored.
    async fn insert(&self, draft: NewEvent) -> Result<Event, StoreError>;

    /// Fetch a single event by id. Absence is `Ok(None)`, not an error.
    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Filtered, sorted, offset-paginated query.
    async fn find_paged(&self, filters: &SearchFilters) -> Result<PageResult<Event>, StoreError>;

    /// Sorted distinct values of one field across all events.
    async fn distinct(&self, field: DistinctField) -> Result<Vec<String>, StoreError>;
}

/// In-memory event store.
///
/// Backed by a `RwLock<HashMap>`; guards are never held across await
/// points. The `fail` toggle lets tests simulate a store outage.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<HashMap<EventId, Event>>,
    fail: AtomicBool,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: subsequent calls return `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "simulated outage".to_string(),
            });
        }
        Ok(())
    }

    fn matches(event: &Event, filters: &SearchFilters) -> bool {
        if let Some(range) = &filters.date_range {
            if !range.contains(event.timestamp) {
                return false;
            }
        }
        if let Some(subject) = &filters.subject_id {
            if &event.subject_id != subject {
                return false;
            }
        }
        if let Some(category) = &filters.category {
            if &event.category != category {
                return false;
            }
        }
        if let Some(fragment) = &filters.url_substring {
            if !event
                .source_url
                .to_lowercase()
                .contains(&fragment.to_lowercase())
            {
                return false;
            }
        }
        if let Some(text) = &filters.free_text {
            let needle = text.to_lowercase();
            let haystack_hit = event.message.to_lowercase().contains(&needle)
                || event.trace.to_lowercase().contains(&needle);
            if !haystack_hit {
                return false;
            }
        }
        true
    }

    fn sort_events(events: &mut [Event], field: SortField, direction: SortDirection) {
        events.sort_by(|a, b| {
            let ordering = match field {
                SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::SubjectId => a.subject_id.cmp(&b.subject_id),
                SortField::Category => a.category.cmp(&b.category),
            };
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert(&self, draft: NewEvent) -> Result<Event, StoreError> {
        self.check_available()?;

        let event = draft.into_event(new_event_id(), chrono::Utc::now());
        let mut events = self.events.write().map_err(|_| StoreError::LockPoisoned)?;
        events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        self.check_available()?;

        let events = self.events.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(events.get(&id).cloned())
    }

    async fn find_paged(&self, filters: &SearchFilters) -> Result<PageResult<Event>, StoreError> {
        self.check_available()?;

        let filters = filters.clone().normalized();
        let mut matched: Vec<Event> = {
            let events = self.events.read().map_err(|_| StoreError::LockPoisoned)?;
            events
                .values()
                .filter(|e| Self::matches(e, &filters))
                .cloned()
                .collect()
        };

        Self::sort_events(&mut matched, filters.sort_field, filters.sort_direction);

        let total = matched.len() as u64;
        let items: Vec<Event> = matched
            .into_iter()
            .skip(filters.offset())
            .take(filters.page_size as usize)
            .collect();

        Ok(PageResult::new(items, total, filters.page, filters.page_size))
    }

    async fn distinct(&self, field: DistinctField) -> Result<Vec<String>, StoreError> {
        self.check_available()?;

        let events = self.events.read().map_err(|_| StoreError::LockPoisoned)?;
        let values: BTreeSet<String> = events
            .values()
            .map(|e| match field {
                DistinctField::SubjectId => e.subject_id.clone(),
                DistinctField::Category => e.category.clone(),
                DistinctField::SourceUrl => e.source_url.clone(),
            })
            .collect();
        Ok(values.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::DateRange;
    use chrono::{Duration, Utc};

    fn draft(subject: &str, category: &str, message: &str) -> NewEvent {
        NewEvent {
            timestamp: Utc::now() - Duration::minutes(1),
            subject_id: subject.to_string(),
            category: category.to_string(),
            source_url: format!("https://example.com/{}", subject),
            message: message.to_string(),
            trace: "at app.js:1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let store = InMemoryEventStore::new();
        let event = store.insert(draft("u1", "Chrome", "boom")).await.unwrap();

        assert_eq!(event.created_at, event.updated_at);
        let fetched = store.find_by_id(event.id).await.unwrap();
        assert_eq!(fetched, Some(event));
    }

    #[tokio::test]
    async fn test_find_by_id_absent_is_none() {
        let store = InMemoryEventStore::new();
        assert_eq!(store.find_by_id(new_event_id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_paged_filters_by_category() {
        let store = InMemoryEventStore::new();
        store.insert(draft("u1", "Chrome", "boom")).await.unwrap();
        store.insert(draft("u2", "Firefox", "boom")).await.unwrap();

        let filters = SearchFilters {
            category: Some("Chrome".to_string()),
            ..Default::default()
        };
        let page = store.find_paged(&filters).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].category, "Chrome");
    }

    #[tokio::test]
    async fn test_find_paged_free_text_matches_message_and_trace() {
        let store = InMemoryEventStore::new();
        store
            .insert(draft("u1", "Chrome", "TypeError: x is undefined"))
            .await
            .unwrap();
        store.insert(draft("u2", "Chrome", "quota hit")).await.unwrap();

        let filters = SearchFilters {
            free_text: Some("typeerror".to_string()),
            ..Default::default()
        };
        let page = store.find_paged(&filters).await.unwrap();
        assert_eq!(page.total, 1);

        // trace text is searched too
        let filters = SearchFilters {
            free_text: Some("app.js".to_string()),
            ..Default::default()
        };
        assert_eq!(store.find_paged(&filters).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_find_paged_date_range() {
        let store = InMemoryEventStore::new();
        let mut old = draft("u1", "Chrome", "old");
        old.timestamp = Utc::now() - Duration::days(10);
        store.insert(old).await.unwrap();
        store.insert(draft("u2", "Chrome", "new")).await.unwrap();

        let filters = SearchFilters {
            date_range: Some(DateRange::new(
                Utc::now() - Duration::days(1),
                Utc::now(),
            )),
            ..Default::default()
        };
        let page = store.find_paged(&filters).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].message, "new");
    }

    #[tokio::test]
    async fn test_find_paged_sorts_and_paginates() {
        let store = InMemoryEventStore::new();
        for i in 0..5 {
            let mut d = draft("u1", "Chrome", &format!("m{}", i));
            d.timestamp = Utc::now() - Duration::minutes(10 - i);
            store.insert(d).await.unwrap();
        }

        let filters = SearchFilters {
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let page = store.find_paged(&filters).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        // default sort is timestamp desc, so page 2 holds m2, m1
        assert_eq!(page.items[0].message, "m2");
        assert_eq!(page.items[1].message, "m1");
    }

    #[tokio::test]
    async fn test_distinct_values_are_sorted() {
        let store = InMemoryEventStore::new();
        store.insert(draft("u2", "Firefox", "a")).await.unwrap();
        store.insert(draft("u1", "Chrome", "b")).await.unwrap();
        store.insert(draft("u1", "Chrome", "c")).await.unwrap();

        let categories = store.distinct(DistinctField::Category).await.unwrap();
        assert_eq!(categories, vec!["Chrome".to_string(), "Firefox".to_string()]);

        let subjects = store.distinct(DistinctField::SubjectId).await.unwrap();
        assert_eq!(subjects, vec!["u1".to_string(), "u2".to_string()]);
    }

    #[tokio::test]
    async fn test_outage_toggle_reports_unavailable() {
        let store = InMemoryEventStore::new();
        store.set_failing(true);
        let err = store.insert(draft("u1", "Chrome", "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }
}
