//! In-memory message bus.
//!
//! Partitioned append-only logs with per-group cursors. Messages with the
//! same key hash to the same partition, so per-key ordering holds; cursors
//! are claimed with compare-and-swap, so within a group each message is
//! delivered to exactly one subscriber.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};

use beacon_core::BusError;

use crate::bus::{Delivery, MessageBus, MessageHeaders, ProducedRecord, SubscriptionHandle};

/// Fallback poll interval for delivery loops; covers wakeups lost between a
/// drain pass and re-registering with the partition notifier.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
struct StoredMessage {
    key: String,
    payload: Vec<u8>,
    headers: MessageHeaders,
}

struct PartitionSlot {
    log: RwLock<Vec<StoredMessage>>,
    notify: Notify,
}

struct TopicLog {
    partitions: Vec<PartitionSlot>,
    /// (group, partition) -> next offset to claim.
    cursors: DashMap<(String, u32), Arc<AtomicU64>>,
}

impl TopicLog {
    fn new(partition_count: u32) -> Self {
        Self {
            partitions: (0..partition_count)
                .map(|_| PartitionSlot {
                    log: RwLock::new(Vec::new()),
                    notify: Notify::new(),
                })
                .collect(),
            cursors: DashMap::new(),
        }
    }

    fn cursor(&self, group: &str, partition: u32) -> Arc<AtomicU64> {
        self.cursors
            .entry((group.to_string(), partition))
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .clone()
    }
}

/// In-memory [`MessageBus`] implementation.
pub struct InMemoryBus {
    partition_count: u32,
    topics: DashMap<String, Arc<TopicLog>>,
}

impl InMemoryBus {
    pub fn new(partition_count: u32) -> Self {
        Self {
            partition_count: partition_count.max(1),
            topics: DashMap::new(),
        }
    }

    fn topic(&self, name: &str) -> Arc<TopicLog> {
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TopicLog::new(self.partition_count)))
            .clone()
    }

    fn partition_for(&self, key: &str) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partition_count as u64) as u32
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(4)
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
        headers: MessageHeaders,
    ) -> Result<ProducedRecord, BusError> {
        let log = self.topic(topic);
        let partition = self.partition_for(key);
        let slot = &log.partitions[partition as usize];

        let offset = {
            let mut messages = slot.log.write().map_err(|_| BusError::PublishFailed {
                topic: topic.to_string(),
                reason: "partition lock poisoned".to_string(),
            })?;
            messages.push(StoredMessage {
                key: key.to_string(),
                payload,
                headers,
            });
            (messages.len() - 1) as u64
        };
        slot.notify.notify_waiters();

        Ok(ProducedRecord {
            topic: topic.to_string(),
            partition,
            offset,
        })
    }

    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
        sink: mpsc::Sender<Delivery>,
    ) -> Result<SubscriptionHandle, BusError> {
        let log = self.topic(topic);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = Vec::with_capacity(log.partitions.len());
        for partition in 0..log.partitions.len() as u32 {
            let log = log.clone();
            let cursor = log.cursor(group_id, partition);
            let sink = sink.clone();
            let topic = topic.to_string();
            let mut shutdown = shutdown_rx.clone();

            tasks.push(tokio::spawn(async move {
                loop {
                    // drain everything claimable right now
                    loop {
                        let next = cursor.load(Ordering::SeqCst);
                        let message = {
                            let slot = &log.partitions[partition as usize];
                            let messages = match slot.log.read() {
                                Ok(m) => m,
                                Err(_) => return,
                            };
                            messages.get(next as usize).cloned()
                        };
                        let Some(message) = message else { break };

                        // claim this offset for the group
                        if cursor
                            .compare_exchange(next, next + 1, Ordering::SeqCst, Ordering::SeqCst)
                            .is_err()
                        {
                            continue;
                        }

                        let delivery = Delivery {
                            topic: topic.clone(),
                            partition,
                            offset: next,
                            key: message.key,
                            payload: message.payload,
                            headers: message.headers,
                        };
                        if sink.send(delivery).await.is_err() {
                            return;
                        }
                    }

                    let slot = &log.partitions[partition as usize];
                    tokio::select! {
                        _ = slot.notify.notified() => {}
                        _ = tokio::time::sleep(POLL_INTERVAL) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return;
                            }
                        }
                    }
                }
            }));
        }

        Ok(SubscriptionHandle::new(shutdown_tx, tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(n: u8) -> Vec<u8> {
        vec![n]
    }

    #[tokio::test]
    async fn test_publish_then_subscribe_delivers() {
        let bus = InMemoryBus::new(2);
        bus.publish("t", "k", payload(1), vec![]).await.unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let handle = bus.subscribe("t", "g", tx).await.unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.payload, payload(1));
        assert_eq!(delivery.key, "k");
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_same_key_preserves_order() {
        let bus = InMemoryBus::new(4);
        for n in 0..10u8 {
            bus.publish("t", "same-key", payload(n), vec![]).await.unwrap();
        }

        let (tx, mut rx) = mpsc::channel(32);
        let handle = bus.subscribe("t", "g", tx).await.unwrap();

        for n in 0..10u8 {
            let delivery = rx.recv().await.unwrap();
            assert_eq!(delivery.payload, payload(n));
            assert_eq!(delivery.offset, n as u64);
        }
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_group_receives_each_message_once() {
        let bus = InMemoryBus::new(1);
        let (tx_a, mut rx_a) = mpsc::channel(64);
        let (tx_b, mut rx_b) = mpsc::channel(64);
        let handle_a = bus.subscribe("t", "g", tx_a).await.unwrap();
        let handle_b = bus.subscribe("t", "g", tx_b).await.unwrap();

        for n in 0..20u8 {
            bus.publish("t", &format!("k{}", n), payload(n), vec![]).await.unwrap();
        }

        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while seen.len() < 20 && tokio::time::Instant::now() < deadline {
            tokio::select! {
                Some(d) = rx_a.recv() => seen.push(d.payload[0]),
                Some(d) = rx_b.recv() => seen.push(d.payload[0]),
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        }

        seen.sort_unstable();
        assert_eq!(seen, (0..20u8).collect::<Vec<_>>());
        handle_a.stop().await;
        handle_b.stop().await;
    }

    #[tokio::test]
    async fn test_independent_groups_both_receive() {
        let bus = InMemoryBus::new(1);
        let (tx_a, mut rx_a) = mpsc::channel(16);
        let (tx_b, mut rx_b) = mpsc::channel(16);
        let handle_a = bus.subscribe("t", "group-a", tx_a).await.unwrap();
        let handle_b = bus.subscribe("t", "group-b", tx_b).await.unwrap();

        bus.publish("t", "k", payload(7), vec![]).await.unwrap();

        assert_eq!(rx_a.recv().await.unwrap().payload, payload(7));
        assert_eq!(rx_b.recv().await.unwrap().payload, payload(7));
        handle_a.stop().await;
        handle_b.stop().await;
    }

    #[tokio::test]
    async fn test_stop_ends_delivery_loops() {
        let bus = InMemoryBus::new(2);
        let (tx, mut rx) = mpsc::channel(16);
        let handle = bus.subscribe("t", "g", tx).await.unwrap();
        handle.stop().await;

        bus.publish("t", "k", payload(1), vec![]).await.unwrap();
        // loops are gone, the sink sees no further deliveries
        assert!(rx.try_recv().is_err());
    }
}
