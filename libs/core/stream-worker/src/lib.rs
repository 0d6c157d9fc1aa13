//! Stream Worker
//!
//! A sequential Redis Streams consumer.
//!
//! ## Features
//!
//! - **Consumer groups**: `XREADGROUP` with own pending entries replayed first
//! - **Strictly sequential**: the next entry is not read until the handler returns
//! - **Fixed backoff**: failed reads are retried without limit after a constant delay
//! - **Cooperative shutdown**: a `watch` flag stops reads and backoff promptly
//! - **Prometheus metrics**: received/handled counters and handler latency
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{RedisStreamConsumer, StreamWorker, WorkerConfig};
//!
//! let config = WorkerConfig::from(&stream_config);
//! let source = RedisStreamConsumer::open(&broker_url, config.clone())?;
//! let worker = StreamWorker::new(source, handler, config);
//! let state = worker.state();
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod error;
pub mod metrics;
mod registry;
mod source;
mod worker;

pub use config::WorkerConfig;
pub use consumer::RedisStreamConsumer;
pub use error::StreamError;
pub use metrics::{StreamMetrics, init_metrics, render_metrics};
pub use registry::MessageHandler;
pub use source::{MessageSource, StreamMessage};
pub use worker::{ConsumerState, StreamWorker};
