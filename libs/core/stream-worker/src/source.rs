//! Broker abstraction the worker pulls from.

use crate::error::StreamError;
use async_trait::async_trait;

/// One entry read from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Broker-assigned entry id, used for acknowledgement
    pub id: String,
    pub payload: Vec<u8>,
}

impl StreamMessage {
    pub fn new(id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
        }
    }
}

/// A pull-based message source.
///
/// Each call to [`next_message`](Self::next_message) either yields a whole
/// entry or nothing; there is no partial state carried between calls.
#[async_trait]
pub trait MessageSource: Send {
    /// Open the broker connection if needed and establish the subscription.
    async fn connect(&mut self) -> Result<(), StreamError>;

    /// Read the next entry. `Ok(None)` means the bounded wait elapsed empty.
    async fn next_message(&mut self) -> Result<Option<StreamMessage>, StreamError>;

    /// Acknowledge a processed entry.
    async fn ack(&mut self, id: &str) -> Result<(), StreamError>;

    /// Release broker resources. Called once when the worker stops.
    async fn close(&mut self);
}
