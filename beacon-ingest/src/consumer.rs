//! Event consumer with typed dispatch.
//!
//! The consumer joins a named group, runs the bus's delivery loops into a
//! local channel, and dispatches each parsed envelope to the handler
//! registered for its payload variant. Failure isolation is per message:
//! parse failures and handler errors are logged and the offset advances
//! regardless.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use async_trait::async_trait;
use beacon_core::{BeaconResult, BusError, NewEvent};

use crate::bus::{Delivery, MessageBus, SubscriptionHandle};
use crate::config::IngestConfig;
use crate::message::{BusMessage, BusPayload, EventType};

/// Buffer between the bus delivery loops and the dispatch worker.
const SINK_CAPACITY: usize = 1024;

/// Handler for event-create payloads arriving over the bus.
///
/// Delivery is at-least-once, so handlers should tolerate duplicates.
#[async_trait]
pub trait IngestHandler: Send + Sync {
    async fn handle(&self, draft: NewEvent) -> BeaconResult<()>;
}

/// Registry mapping payload variants to handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventType, Arc<dyn IngestHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event_type: EventType, handler: Arc<dyn IngestHandler>) {
        self.handlers.insert(event_type, handler);
        debug!(event_type = %event_type, "registered ingest handler");
    }

    pub fn get(&self, event_type: EventType) -> Option<Arc<dyn IngestHandler>> {
        self.handlers.get(&event_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Consumer lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connected,
    Consuming,
    Stopped,
}

/// Consumer half of the ingestion pipeline.
pub struct EventConsumer {
    bus: Arc<dyn MessageBus>,
    config: IngestConfig,
    registry: Arc<HandlerRegistry>,
    state: Mutex<ConsumerState>,
    subscription: Mutex<Option<SubscriptionHandle>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventConsumer {
    pub fn new(bus: Arc<dyn MessageBus>, config: IngestConfig, registry: HandlerRegistry) -> Self {
        Self {
            bus,
            config,
            registry: Arc::new(registry),
            state: Mutex::new(ConsumerState::Disconnected),
            subscription: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.lock().expect("consumer state lock")
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ConsumerState::Connected | ConsumerState::Consuming)
    }

    pub fn is_consuming(&self) -> bool {
        self.state() == ConsumerState::Consuming
    }

    fn set_state(&self, state: ConsumerState) {
        *self.state.lock().expect("consumer state lock") = state;
    }

    /// Establish the bus connection. Idempotent; a consuming consumer stays
    /// consuming.
    pub fn connect(&self) {
        if self.state() != ConsumerState::Consuming {
            self.set_state(ConsumerState::Connected);
        }
    }

    /// Subscribe and start dispatching. Returns success without side effect
    /// when already consuming.
    pub async fn start_consuming(&self) -> Result<(), BusError> {
        match self.state() {
            ConsumerState::Consuming => return Ok(()),
            ConsumerState::Connected => {}
            ConsumerState::Disconnected | ConsumerState::Stopped => {
                return Err(BusError::NotConnected);
            }
        }

        let (tx, mut rx) = mpsc::channel::<Delivery>(SINK_CAPACITY);
        let handle = self
            .bus
            .subscribe(&self.config.topic, &self.config.group_id, tx)
            .await?;

        let registry = self.registry.clone();
        let worker = tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                process_delivery(&registry, delivery).await;
            }
        });

        *self.subscription.lock().expect("subscription lock") = Some(handle);
        *self.worker.lock().expect("worker lock") = Some(worker);
        self.set_state(ConsumerState::Consuming);

        debug!(
            topic = %self.config.topic,
            group_id = %self.config.group_id,
            "consumer started"
        );
        Ok(())
    }

    /// Stop dispatching. Safe to call when not consuming.
    pub async fn stop_consuming(&self) {
        let handle = self.subscription.lock().expect("subscription lock").take();
        let worker = self.worker.lock().expect("worker lock").take();

        if let Some(handle) = handle {
            handle.stop().await;
        }
        if let Some(worker) = worker {
            let _ = worker.await;
        }
        if self.state() == ConsumerState::Consuming {
            self.set_state(ConsumerState::Stopped);
        }
    }

    /// Stop and drop the connection. Safe to call in any state.
    pub async fn disconnect(&self) {
        self.stop_consuming().await;
        self.set_state(ConsumerState::Disconnected);
    }
}

/// Handle one delivered message. Every failure path logs and returns; the
/// offset has already advanced, so a poison message is never retried.
async fn process_delivery(registry: &HandlerRegistry, delivery: Delivery) {
    let message: BusMessage = match serde_json::from_slice(&delivery.payload) {
        Ok(message) => message,
        Err(e) => {
            warn!(
                topic = %delivery.topic,
                partition = delivery.partition,
                offset = delivery.offset,
                error = %e,
                "discarding malformed bus message"
            );
            return;
        }
    };

    let event_type = message.payload.event_type();
    let Some(handler) = registry.get(event_type) else {
        warn!(
            topic = %delivery.topic,
            partition = delivery.partition,
            offset = delivery.offset,
            event_type = %event_type,
            "no handler registered for event type, discarding"
        );
        return;
    };

    let BusPayload::ErrorEvent(draft) = message.payload;
    let subject_id = draft.subject_id.clone();
    if let Err(e) = handler.handle(draft).await {
        error!(
            topic = %delivery.topic,
            partition = delivery.partition,
            offset = delivery.offset,
            event_type = %event_type,
            subject_id = %subject_id,
            error = %e,
            "event handler failed, message dropped"
        );
    }
}
