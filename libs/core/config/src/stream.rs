use crate::{env_or_default, env_parse_or, ConfigError, FromEnv};

pub const DEFAULT_BROKER_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_TOPIC: &str = "notifications:requests";
pub const DEFAULT_CONSUMER_GROUP: &str = "notification_workers";
pub const DEFAULT_PAYLOAD_FIELD: &str = "value";
pub const DEFAULT_BLOCK_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MS: u64 = 1000;

/// Connection and subscription settings for the Redis stream broker
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamConfig {
    pub broker_url: String,
    pub topic: String,
    pub consumer_group: String,
    pub consumer_id: String,
    pub payload_field: String,
    /// How long a single XREADGROUP may block waiting for entries
    pub block_ms: u64,
    /// Fixed delay before retrying after a failed read
    pub backoff_ms: u64,
}

impl StreamConfig {
    pub fn new(broker_url: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            broker_url: broker_url.into(),
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn with_consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = group.into();
        self
    }

    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }
}

fn generated_consumer_id() -> String {
    format!("worker-{}", uuid::Uuid::new_v4())
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            broker_url: DEFAULT_BROKER_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            consumer_group: DEFAULT_CONSUMER_GROUP.to_string(),
            consumer_id: generated_consumer_id(),
            payload_field: DEFAULT_PAYLOAD_FIELD.to_string(),
            block_ms: DEFAULT_BLOCK_MS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

impl FromEnv for StreamConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let consumer_id = std::env::var("STREAM_CONSUMER_ID")
            .ok()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generated_consumer_id);

        Ok(Self {
            broker_url: env_or_default("STREAM_BROKER_URL", DEFAULT_BROKER_URL),
            topic: env_or_default("STREAM_TOPIC", DEFAULT_TOPIC),
            consumer_group: env_or_default("STREAM_CONSUMER_GROUP", DEFAULT_CONSUMER_GROUP),
            consumer_id,
            payload_field: env_or_default("STREAM_PAYLOAD_FIELD", DEFAULT_PAYLOAD_FIELD),
            block_ms: env_parse_or("STREAM_BLOCK_MS", DEFAULT_BLOCK_MS)?,
            backoff_ms: env_parse_or("STREAM_BACKOFF_MS", DEFAULT_BACKOFF_MS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "STREAM_BROKER_URL",
        "STREAM_TOPIC",
        "STREAM_CONSUMER_GROUP",
        "STREAM_CONSUMER_ID",
        "STREAM_PAYLOAD_FIELD",
        "STREAM_BLOCK_MS",
        "STREAM_BACKOFF_MS",
    ];

    #[test]
    fn test_stream_config_defaults() {
        temp_env::with_vars_unset(VARS, || {
            let config = StreamConfig::from_env().unwrap();
            assert_eq!(config.broker_url, DEFAULT_BROKER_URL);
            assert_eq!(config.topic, "notifications:requests");
            assert_eq!(config.consumer_group, "notification_workers");
            assert!(config.consumer_id.starts_with("worker-"));
            assert_eq!(config.payload_field, "value");
            assert_eq!(config.block_ms, 1000);
            assert_eq!(config.backoff_ms, 1000);
        });
    }

    #[test]
    fn test_stream_config_overrides() {
        temp_env::with_vars(
            [
                ("STREAM_BROKER_URL", Some("redis://redis:6379")),
                ("STREAM_TOPIC", Some("user_events")),
                ("STREAM_CONSUMER_GROUP", Some("mailers")),
                ("STREAM_CONSUMER_ID", Some("worker-a")),
                ("STREAM_PAYLOAD_FIELD", Some("payload")),
                ("STREAM_BLOCK_MS", Some("50")),
                ("STREAM_BACKOFF_MS", Some("200")),
            ],
            || {
                let config = StreamConfig::from_env().unwrap();
                assert_eq!(config.broker_url, "redis://redis:6379");
                assert_eq!(config.topic, "user_events");
                assert_eq!(config.consumer_group, "mailers");
                assert_eq!(config.consumer_id, "worker-a");
                assert_eq!(config.payload_field, "payload");
                assert_eq!(config.block_ms, 50);
                assert_eq!(config.backoff_ms, 200);
            },
        );
    }

    #[test]
    fn test_stream_config_invalid_block() {
        temp_env::with_var("STREAM_BLOCK_MS", Some("-1"), || {
            let err = StreamConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("STREAM_BLOCK_MS"));
        });
    }

    #[test]
    fn test_generated_consumer_ids_are_unique() {
        assert_ne!(StreamConfig::default().consumer_id, StreamConfig::default().consumer_id);
    }

    #[test]
    fn test_builder() {
        let config = StreamConfig::new("redis://x:1", "topic")
            .with_consumer_group("g")
            .with_consumer_id("c");
        assert_eq!(config.broker_url, "redis://x:1");
        assert_eq!(config.topic, "topic");
        assert_eq!(config.consumer_group, "g");
        assert_eq!(config.consumer_id, "c");
    }
}
