//! Ingestion pipeline configuration.

/// Configuration shared by the producer and consumer.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Topic events are published to and consumed from.
    pub topic: String,
    /// Consumer group; exactly one member of the group handles a message.
    pub group_id: String,
    /// Partition count for the in-memory bus.
    pub partition_count: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            topic: "events".to_string(),
            group_id: "beacon-consumers".to_string(),
            partition_count: 4,
        }
    }
}

impl IngestConfig {
    /// Build from environment variables, falling back to defaults.
    ///
    /// # Environment Variables
    /// - `BEACON_BUS_TOPIC`: topic name (default: "events")
    /// - `BEACON_BUS_GROUP_ID`: consumer group (default: "beacon-consumers")
    /// - `BEACON_BUS_PARTITIONS`: partition count (default: 4)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            topic: std::env::var("BEACON_BUS_TOPIC").unwrap_or(defaults.topic),
            group_id: std::env::var("BEACON_BUS_GROUP_ID").unwrap_or(defaults.group_id),
            partition_count: std::env::var("BEACON_BUS_PARTITIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.partition_count),
        }
    }
}
