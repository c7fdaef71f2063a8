//! Message bus collaborator contract.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use beacon_core::BusError;

/// Header list attached to a published message.
pub type MessageHeaders = Vec<(String, String)>;

/// Acknowledgement of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducedRecord {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: MessageHeaders,
}

/// Handle for an active subscription. Stopping shuts down the delivery
/// loops and closes the sink.
pub struct SubscriptionHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn new(shutdown: watch::Sender<bool>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { shutdown, tasks }
    }

    /// Signal the delivery loops to stop and wait for them to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Message bus contract.
///
/// Delivery is at-least-once; ordering is preserved only within a single
/// partition, and messages with the same key land on the same partition.
/// Within a consumer group each message is handed to exactly one
/// subscriber.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish one message, keyed for partition routing.
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
        headers: MessageHeaders,
    ) -> Result<ProducedRecord, BusError>;

    /// Join `group_id` on `topic`, feeding deliveries into `sink`. Runs one
    /// delivery loop per partition until the returned handle is stopped.
    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
        sink: mpsc::Sender<Delivery>,
    ) -> Result<SubscriptionHandle, BusError>;
}
