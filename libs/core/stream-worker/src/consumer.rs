//! Redis Streams implementation of [`MessageSource`].

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::source::{MessageSource, StreamMessage};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::streams::{StreamId, StreamReadReply};
use redis::{Client, RedisResult};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Headroom on top of `BLOCK` before the client gives up on a reply.
const RESPONSE_MARGIN: Duration = Duration::from_secs(1);

/// Consumer-group reader for a single stream, one entry at a time.
///
/// Nothing touches the network until [`MessageSource::connect`], so an
/// unreachable broker surfaces as a retried connect rather than a startup
/// failure. Entries already delivered to this consumer but never
/// acknowledged are replayed before any new entry is requested.
pub struct RedisStreamConsumer {
    client: Client,
    redis: Option<ConnectionManager>,
    config: WorkerConfig,
    replaying_pending: bool,
}

impl RedisStreamConsumer {
    pub fn new(client: Client, config: WorkerConfig) -> Self {
        Self {
            client,
            redis: None,
            config,
            replaying_pending: true,
        }
    }

    /// Parse `url` without connecting.
    pub fn open(url: &str, config: WorkerConfig) -> Result<Self, StreamError> {
        Ok(Self::new(Client::open(url)?, config))
    }

    /// Connection settings for the consumer.
    ///
    /// The response timeout covers a full `BLOCK` wait. The worker owns the
    /// retry cadence, so the manager does not retry on its own.
    fn connection_config(&self) -> ConnectionManagerConfig {
        let response_timeout = (self.config.block_timeout_ms > 0)
            .then(|| Duration::from_millis(self.config.block_timeout_ms) + RESPONSE_MARGIN);

        ConnectionManagerConfig::new()
            .set_response_timeout(response_timeout)
            .set_number_of_retries(0)
    }

    fn connection(&mut self) -> Result<&mut ConnectionManager, StreamError> {
        self.redis.as_mut().ok_or(StreamError::NotConnected)
    }

    /// Create the consumer group at the stream tail, creating the stream if needed.
    async fn ensure_consumer_group(&mut self) -> Result<(), StreamError> {
        let mut cmd = redis::cmd("XGROUP");
        cmd.arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM");

        let result: RedisResult<()> = cmd.query_async(self.connection()?).await;

        match result {
            Ok(()) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    async fn read_group(&mut self) -> Result<Option<StreamReadReply>, StreamError> {
        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg("COUNT")
            .arg(1);

        // Pending replay must not block: an empty reply means we are caught up.
        let start_id = if self.replaying_pending {
            "0"
        } else {
            cmd.arg("BLOCK").arg(self.config.block_timeout_ms);
            ">"
        };

        cmd.arg("STREAMS").arg(&self.config.stream_name).arg(start_id);

        Ok(cmd.query_async(self.connection()?).await?)
    }

    fn first_entry(reply: Option<StreamReadReply>) -> Option<StreamId> {
        reply?.keys.into_iter().flat_map(|key| key.ids).next()
    }
}

#[async_trait]
impl MessageSource for RedisStreamConsumer {
    async fn connect(&mut self) -> Result<(), StreamError> {
        if self.redis.is_none() {
            let manager = self
                .client
                .get_connection_manager_with_config(self.connection_config())
                .await?;
            self.redis = Some(manager);
        }

        let _: String = redis::cmd("PING").query_async(self.connection()?).await?;
        self.ensure_consumer_group().await?;
        self.replaying_pending = true;

        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            consumer_id = %self.config.consumer_id,
            "Subscribed to stream"
        );
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<StreamMessage>, StreamError> {
        let reply = match self.read_group().await {
            Ok(reply) => reply,
            Err(e) if e.is_nogroup_error() => {
                warn!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group missing, recreating"
                );
                self.ensure_consumer_group().await?;
                self.replaying_pending = true;
                return Ok(None);
            }
            Err(e) => {
                // Whatever was in flight is still in the pending list.
                self.replaying_pending = true;
                return Err(e);
            }
        };

        let Some(entry) = Self::first_entry(reply) else {
            if self.replaying_pending {
                debug!(consumer_id = %self.config.consumer_id, "Pending entries drained");
                self.replaying_pending = false;
            }
            return Ok(None);
        };

        match entry.get::<Vec<u8>>(&self.config.payload_field) {
            Some(payload) => Ok(Some(StreamMessage::new(entry.id, payload))),
            None => {
                warn!(
                    stream_id = %entry.id,
                    field = %self.config.payload_field,
                    fields = ?entry.map.keys().collect::<Vec<_>>(),
                    "Entry has no payload field, acknowledging and skipping"
                );
                self.ack(&entry.id).await?;
                Ok(None)
            }
        }
    }

    async fn ack(&mut self, id: &str) -> Result<(), StreamError> {
        let mut cmd = redis::cmd("XACK");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(id);

        let _: i64 = cmd.query_async(self.connection()?).await?;

        debug!(stream_id = %id, "Acknowledged entry");
        Ok(())
    }

    async fn close(&mut self) {
        self.redis = None;
        info!(consumer_id = %self.config.consumer_id, "Stream consumer closed");
    }
}
