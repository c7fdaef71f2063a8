//! Realtime event broadcasting.
//!
//! Best-effort fan-out to in-process listeners over a tokio broadcast
//! channel. Broadcasting never blocks the caller; with no receivers the
//! event is dropped, and a lagging receiver misses events rather than
//! applying backpressure.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use beacon_core::Event;

/// Events broadcast to connected listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServiceEvent {
    /// A new event was persisted.
    EventCreated { event: Event },
}

impl ServiceEvent {
    /// Event type name for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            ServiceEvent::EventCreated { .. } => "EventCreated",
        }
    }
}

/// Broadcast handle shared across the service.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ServiceEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Broadcast an event to all connected listeners.
    pub fn broadcast(&self, event: ServiceEvent) {
        let event_type = event.event_type();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(event_type, receivers, "broadcast service event");
            }
            Err(_) => {
                debug!(event_type, "no receivers for service event");
            }
        }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(crate::constants::NOTIFIER_CAPACITY)
    }
}
