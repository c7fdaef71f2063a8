//! Shared harness for beacon-service integration tests.

// Not every test binary touches every handle.
#![allow(dead_code)]

use std::sync::Arc;

use beacon_ingest::{EventConsumer, EventProducer, InMemoryBus, IngestConfig};
use beacon_search::{InMemorySearchEngine, SearchIndexAdapter};
use beacon_service::{CachePolicy, EventService, Notifier};
use beacon_storage::{InMemoryCacheStore, InMemoryEventStore, TaggedCache};

/// Full in-process wiring of the pipeline: store, engine, cache, bus,
/// producer, service, and a consumer that is constructed but not started.
pub struct Harness {
    pub store: Arc<InMemoryEventStore>,
    pub engine: Arc<InMemorySearchEngine>,
    pub cache_store: Arc<InMemoryCacheStore>,
    pub cache: TaggedCache,
    pub bus: Arc<InMemoryBus>,
    pub producer: Arc<EventProducer>,
    pub service: Arc<EventService>,
    pub consumer: EventConsumer,
}

pub async fn harness() -> Harness {
    init_tracing();

    let config = IngestConfig::default();
    let store = Arc::new(InMemoryEventStore::new());
    let engine = Arc::new(InMemorySearchEngine::new());
    let adapter = SearchIndexAdapter::new(engine.clone(), store.clone());
    adapter.ensure_index().await.expect("ensure index");

    let cache_store = Arc::new(InMemoryCacheStore::new());
    let cache = TaggedCache::new(cache_store.clone());

    let bus = Arc::new(InMemoryBus::new(config.partition_count));
    let producer = Arc::new(EventProducer::new(bus.clone(), config.topic.clone()));
    producer.connect();

    let service = Arc::new(EventService::new(
        store.clone(),
        adapter,
        cache.clone(),
        producer.clone(),
        Notifier::default(),
        CachePolicy::default(),
    ));

    let registry = EventService::ingest_registry(service.clone());
    let consumer = EventConsumer::new(bus.clone(), config, registry);

    Harness {
        store,
        engine,
        cache_store,
        cache,
        bus,
        producer,
        service,
        consumer,
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
