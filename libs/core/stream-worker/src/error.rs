//! Stream error types

use thiserror::Error;

/// Stream processing errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A read or ack was attempted before [`connect`](crate::MessageSource::connect) succeeded
    #[error("Not connected to the stream broker")]
    NotConnected,

    /// The message handler rejected or failed to process a payload
    #[error("Handler error: {0}")]
    Handler(String),
}

impl StreamError {
    pub fn handler(message: impl Into<String>) -> Self {
        StreamError::Handler(message.into())
    }

    /// The consumer group or stream vanished (e.g. after a broker flush).
    pub fn is_nogroup_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.code() == Some("NOGROUP"))
    }
}
