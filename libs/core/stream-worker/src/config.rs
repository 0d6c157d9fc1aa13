//! Worker configuration

use core_config::stream::{self, StreamConfig};
use std::time::Duration;

/// Settings for a single stream consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Redis stream key
    pub stream_name: String,

    pub consumer_group: String,

    /// Unique consumer name inside the group
    pub consumer_id: String,

    /// Entry field holding the message bytes
    pub payload_field: String,

    /// Upper bound on a single blocking read
    pub block_timeout_ms: u64,

    /// Delay before retrying after a failed read
    pub backoff: Duration,
}

impl WorkerConfig {
    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            consumer_group: consumer_group.into(),
            ..Self::from(&StreamConfig::default())
        }
    }

    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    pub fn with_payload_field(mut self, field: impl Into<String>) -> Self {
        self.payload_field = field.into();
        self
    }

    pub fn with_block_timeout_ms(mut self, timeout: u64) -> Self {
        self.block_timeout_ms = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

impl From<&StreamConfig> for WorkerConfig {
    fn from(config: &StreamConfig) -> Self {
        Self {
            stream_name: config.topic.clone(),
            consumer_group: config.consumer_group.clone(),
            consumer_id: config.consumer_id.clone(),
            payload_field: config.payload_field.clone(),
            block_timeout_ms: config.block_ms,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new(stream::DEFAULT_TOPIC, stream::DEFAULT_CONSUMER_GROUP)
    }
}
