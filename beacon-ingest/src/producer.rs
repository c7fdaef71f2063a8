//! Event producer.
//!
//! Publishes one envelope per create call. The routing key is the event id,
//! so retries of the same event stay on one partition and the broker-side
//! idempotent-producer configuration (single in-flight request, broker
//! dedupe) can suppress duplicates. Headers mirror the event's routing
//! fields for middleboxes that inspect without parsing the payload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use beacon_core::{BusError, EventId, NewEvent};

use crate::bus::{MessageBus, MessageHeaders, ProducedRecord};
use crate::message::{BusMessage, BusPayload};

/// Producer half of the ingestion pipeline.
pub struct EventProducer {
    bus: Arc<dyn MessageBus>,
    topic: String,
    connected: AtomicBool,
}

impl EventProducer {
    pub fn new(bus: Arc<dyn MessageBus>, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
            connected: AtomicBool::new(false),
        }
    }

    /// Mark the producer connected. Idempotent.
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Mark the producer disconnected. Safe to call when already down.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish one create request, keyed by the event's id.
    pub async fn publish_event(
        &self,
        event_id: EventId,
        draft: &NewEvent,
    ) -> Result<ProducedRecord, BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected);
        }

        let message = BusMessage::new(BusPayload::ErrorEvent(draft.clone()));
        let event_type = message.payload.event_type();
        let payload = serde_json::to_vec(&message).map_err(|e| BusError::PublishFailed {
            topic: self.topic.clone(),
            reason: format!("envelope serialization failed: {}", e),
        })?;

        let headers: MessageHeaders = vec![
            ("event_type".to_string(), event_type.as_str().to_string()),
            ("subject_id".to_string(), draft.subject_id.clone()),
            ("category".to_string(), draft.category.clone()),
            ("timestamp".to_string(), draft.timestamp.to_rfc3339()),
        ];

        let record = self
            .bus
            .publish(&self.topic, &event_id.to_string(), payload, headers)
            .await?;

        debug!(
            event_id = %event_id,
            topic = %record.topic,
            partition = record.partition,
            offset = record.offset,
            "published event to bus"
        );
        Ok(record)
    }
}
