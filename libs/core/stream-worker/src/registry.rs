//! Handler contract invoked for every stream entry.

use crate::error::StreamError;
use async_trait::async_trait;

/// Processes the raw payload of one stream entry.
///
/// The worker awaits `handle` before reading the next entry, so a slow
/// handler throttles ingestion. Errors are logged by the worker and the
/// entry is acknowledged anyway; they never stop the loop.
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl MessageHandler for Echo {
///     async fn handle(&self, payload: &[u8]) -> Result<(), StreamError> {
///         tracing::info!(len = payload.len(), "got payload");
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "Echo"
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<(), StreamError>;

    /// Handler name used as a log field and metrics label.
    fn name(&self) -> &'static str;
}
