//! Search cache lifecycle: miss, hit, invalidation on create, and
//! idempotent read-through.

mod support;

use std::time::Duration;

use beacon_core::SearchFilters;
use beacon_storage::CacheOutcome;
use beacon_test_utils::{wait_until, DraftBuilder};

const WAIT: Duration = Duration::from_secs(3);

fn chrome_filters() -> SearchFilters {
    SearchFilters {
        category: Some("Chrome".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_search_miss_then_hit_then_invalidation() {
    let h = support::harness().await;
    // every post-create invalidation publishes a notice; use it to know the
    // detached invalidation task has finished
    let mut invalidations = h.cache.subscribe_invalidations();

    h.service
        .create(
            DraftBuilder::new()
                .subject("u1")
                .category("Chrome")
                .message("TypeError")
                .build(),
        )
        .await
        .unwrap();

    // indexing and invalidation are detached; wait for both to land
    tokio::time::timeout(WAIT, invalidations.recv())
        .await
        .expect("invalidation notice")
        .unwrap();
    let engine = h.engine.clone();
    assert!(wait_until(WAIT, || async { engine.doc_count() == 1 }).await);

    // first search: cache miss, sourced from the engine
    let page = h.service.search(&chrome_filters()).await.unwrap();
    assert_eq!(page.total, 1);
    let queries_after_first = h.engine.search_count();

    // identical search: cache hit, no second engine query
    let page = h.service.search(&chrome_filters()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(h.engine.search_count(), queries_after_first);

    // a second Chrome create invalidates the category-scoped search cache
    h.service
        .create(
            DraftBuilder::new()
                .subject("u2")
                .category("Chrome")
                .message("RangeError")
                .build(),
        )
        .await
        .unwrap();

    tokio::time::timeout(WAIT, invalidations.recv())
        .await
        .expect("invalidation notice")
        .unwrap();
    let engine = h.engine.clone();
    assert!(wait_until(WAIT, || async { engine.doc_count() == 2 }).await);

    // the cached Chrome page is gone
    let key = beacon_service::derive_key(
        beacon_service::constants::SEARCH_SCOPE,
        &beacon_service::filter_params(&chrome_filters().normalized()),
    );
    assert!(matches!(
        h.cache.get::<serde_json::Value>(&key).await,
        Ok(CacheOutcome::Miss)
    ));

    // next identical search is freshly sourced and sees both events
    let before = h.engine.search_count();
    let page = h.service.search(&chrome_filters()).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(h.engine.search_count(), before + 1);
}

#[tokio::test]
async fn test_idempotent_read_through() {
    let h = support::harness().await;

    h.service.create(DraftBuilder::new().build()).await.unwrap();
    let engine = h.engine.clone();
    assert!(wait_until(WAIT, || async { engine.doc_count() == 1 }).await);

    let first = h.service.search(&SearchFilters::default()).await.unwrap();
    let second = h.service.search(&SearchFilters::default()).await.unwrap();

    let first_bytes = serde_json::to_vec(&first).unwrap();
    let second_bytes = serde_json::to_vec(&second).unwrap();
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn test_get_by_id_caches_found_events_only() {
    let h = support::harness().await;

    let event = h.service.create(DraftBuilder::new().build()).await.unwrap();

    let fetched = h.service.get_by_id(event.id).await.unwrap();
    assert_eq!(fetched.id, event.id);

    // cached now; a store outage no longer affects the read
    h.store.set_failing(true);
    let fetched = h.service.get_by_id(event.id).await.unwrap();
    assert_eq!(fetched.id, event.id);
    h.store.set_failing(false);

    // absent ids are typed failures and never cached
    let missing = beacon_core::new_event_id();
    let err = h.service.get_by_id(missing).await.unwrap_err();
    assert!(matches!(err, beacon_core::BeaconError::NotFound { id } if id == missing));
    let err = h.service.get_by_id(missing).await.unwrap_err();
    assert!(matches!(err, beacon_core::BeaconError::NotFound { .. }));
}

#[tokio::test]
async fn test_reference_lists_cache_and_refresh_on_new_value() {
    let h = support::harness().await;

    h.service
        .create(DraftBuilder::new().subject("u1").category("Chrome").build())
        .await
        .unwrap();

    let categories = h.service.categories().await.unwrap();
    assert_eq!(categories, vec!["Chrome".to_string()]);

    // a create with a brand-new category invalidates the cached list
    h.service
        .create(DraftBuilder::new().subject("u2").category("Firefox").build())
        .await
        .unwrap();

    let service = h.service.clone();
    assert!(
        wait_until(WAIT, || {
            let service = service.clone();
            async move {
                service.categories().await.unwrap()
                    == vec!["Chrome".to_string(), "Firefox".to_string()]
            }
        })
        .await
    );
}

#[tokio::test]
async fn test_cache_outage_degrades_to_source() {
    let h = support::harness().await;

    h.service.create(DraftBuilder::new().build()).await.unwrap();
    let engine = h.engine.clone();
    assert!(wait_until(WAIT, || async { engine.doc_count() == 1 }).await);

    h.cache_store.set_failing(true);
    // reads still succeed, sourced directly
    let page = h.service.search(&SearchFilters::default()).await.unwrap();
    assert_eq!(page.total, 1);
    let subjects = h.service.subjects().await.unwrap();
    assert_eq!(subjects, vec!["u1".to_string()]);
}
