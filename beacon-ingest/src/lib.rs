//! Beacon Ingest - Event Ingestion Pipeline
//!
//! Message-bus producer and consumer with typed event dispatch. The bus is
//! an at-least-once, partition-ordered channel decoupling event producers
//! from the persistence path; handlers must tolerate duplicates.
//!
//! Failure isolation is per message: a malformed payload, an unregistered
//! event type, or a failing handler is logged and discarded while the
//! consumer keeps advancing. There is no redelivery and no dead-letter
//! topic.

pub mod bus;
pub mod config;
pub mod consumer;
pub mod memory;
pub mod message;
pub mod producer;

pub use bus::{Delivery, MessageBus, ProducedRecord, SubscriptionHandle};
pub use config::IngestConfig;
pub use consumer::{ConsumerState, EventConsumer, HandlerRegistry, IngestHandler};
pub use memory::InMemoryBus;
pub use message::{BusMessage, BusPayload, EventType, SOURCE_VERSION};
pub use producer::EventProducer;
