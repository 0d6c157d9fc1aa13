//! The consumer loop.
//!
//! `Connecting -> Reading <-> Backoff -> ShuttingDown -> Closed`

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::metrics::StreamMetrics;
use crate::registry::MessageHandler;
use crate::source::{MessageSource, StreamMessage};
use std::sync::Arc;
use std::time::Instant;
use strum::{AsRefStr, Display};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`StreamWorker`], observable through [`StreamWorker::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConsumerState {
    Connecting,
    Reading,
    Backoff,
    ShuttingDown,
    Closed,
}

impl ConsumerState {
    /// True while the worker is able to pull entries.
    pub fn is_ready(&self) -> bool {
        matches!(self, ConsumerState::Reading)
    }
}

/// Resolves once the shutdown flag is set. A dropped sender never resolves.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Pulls entries from a [`MessageSource`] one at a time and hands each payload
/// to a [`MessageHandler`].
pub struct StreamWorker<S, H>
where
    S: MessageSource,
    H: MessageHandler + ?Sized,
{
    source: S,
    handler: Arc<H>,
    config: WorkerConfig,
    metrics: StreamMetrics,
    state: watch::Sender<ConsumerState>,
}

impl<S, H> StreamWorker<S, H>
where
    S: MessageSource,
    H: MessageHandler + ?Sized,
{
    pub fn new(source: S, handler: Arc<H>, config: WorkerConfig) -> Self {
        let metrics = StreamMetrics::new(config.stream_name.clone(), handler.name());
        let (state, _) = watch::channel(ConsumerState::Connecting);

        Self {
            source,
            handler,
            config,
            metrics,
            state,
        }
    }

    /// Subscribe to state transitions.
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: ConsumerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Consumer state changed");
        }
    }

    /// Run until `shutdown` flips to `true`.
    ///
    /// Read failures are retried forever after a fixed backoff. Handler
    /// failures are logged and the entry is still acknowledged. An in-flight
    /// handler call always runs to completion.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            consumer_id = %self.config.consumer_id,
            handler = %self.handler.name(),
            backoff_ms = self.config.backoff.as_millis() as u64,
            "Starting stream worker"
        );

        if self.connect(&mut shutdown).await {
            self.read_loop(&mut shutdown).await;
        }

        self.set_state(ConsumerState::ShuttingDown);
        self.source.close().await;
        self.set_state(ConsumerState::Closed);
        info!(stream = %self.config.stream_name, "Stream worker stopped");
        Ok(())
    }

    /// Returns false when shutdown arrived before a connection was made.
    async fn connect(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        self.set_state(ConsumerState::Connecting);

        loop {
            if *shutdown.borrow() {
                return false;
            }

            let result = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => return false,
                result = self.source.connect() => result,
            };

            match result {
                Ok(()) => return true,
                Err(e) => {
                    self.metrics.read_error();
                    warn!(error = %e, "Failed to connect to stream, retrying");
                    if !self.backoff(shutdown).await {
                        return false;
                    }
                    self.set_state(ConsumerState::Connecting);
                }
            }
        }
    }

    async fn read_loop(&mut self, shutdown: &mut watch::Receiver<bool>) {
        self.set_state(ConsumerState::Reading);
        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping worker");
                return;
            }

            let read = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => {
                    info!("Received shutdown signal, stopping worker");
                    return;
                }
                read = self.source.next_message() => read,
            };

            let outcome = match read {
                Ok(Some(message)) => self.dispatch(message).await,
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    if consecutive_errors > 0 {
                        info!(consecutive_errors, "Stream connection recovered");
                        consecutive_errors = 0;
                    }
                }
                Err(e) => {
                    if *shutdown.borrow() {
                        debug!(error = %e, "Stream error during shutdown");
                        return;
                    }
                    consecutive_errors += 1;
                    self.metrics.read_error();
                    warn!(error = %e, consecutive_errors, "Error reading from stream, backing off");
                    if !self.backoff(shutdown).await {
                        return;
                    }
                    self.set_state(ConsumerState::Reading);
                }
            }
        }
    }

    /// Sleep for the configured backoff. Returns false if shutdown interrupted it.
    async fn backoff(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        self.set_state(ConsumerState::Backoff);
        tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => false,
            _ = tokio::time::sleep(self.config.backoff) => true,
        }
    }

    /// Hand one entry to the handler, then acknowledge it.
    ///
    /// Only an acknowledgement failure is returned; handler failures end here.
    async fn dispatch(&mut self, message: StreamMessage) -> Result<(), StreamError> {
        self.metrics.message_received();
        debug!(
            stream_id = %message.id,
            value = %String::from_utf8_lossy(&message.payload),
            "Received stream message"
        );

        let started = Instant::now();
        let result = self.handler.handle(&message.payload).await;
        self.metrics.message_handled(result.is_ok(), started.elapsed());

        if let Err(e) = result {
            error!(
                stream_id = %message.id,
                handler = %self.handler.name(),
                error = %e,
                "Failed to handle stream message"
            );
        }

        self.source.ack(&message.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    type Step = Result<Option<StreamMessage>, StreamError>;

    /// Replays scripted reads, then blocks forever.
    struct ScriptedSource {
        connects: VecDeque<Result<(), StreamError>>,
        reads: VecDeque<Step>,
        acks: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    impl ScriptedSource {
        fn new(reads: Vec<Step>) -> Self {
            Self {
                connects: VecDeque::new(),
                reads: reads.into(),
                acks: Arc::default(),
                closed: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl MessageSource for ScriptedSource {
        async fn connect(&mut self) -> Result<(), StreamError> {
            self.connects.pop_front().unwrap_or(Ok(()))
        }

        async fn next_message(&mut self) -> Result<Option<StreamMessage>, StreamError> {
            match self.reads.pop_front() {
                Some(step) => step,
                None => std::future::pending().await,
            }
        }

        async fn ack(&mut self, id: &str) -> Result<(), StreamError> {
            self.acks.lock().unwrap().push(id.to_string());
            Ok(())
        }

        async fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct RecordingHandler {
        calls: mpsc::UnboundedSender<(Vec<u8>, tokio::time::Instant)>,
        fail: bool,
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle(&self, payload: &[u8]) -> Result<(), StreamError> {
            let _ = self.calls.send((payload.to_vec(), tokio::time::Instant::now()));
            if self.fail {
                Err(StreamError::handler("boom"))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            "RecordingHandler"
        }
    }

    type Calls = mpsc::UnboundedReceiver<(Vec<u8>, tokio::time::Instant)>;

    fn handler(fail: bool) -> (Arc<RecordingHandler>, Calls) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(RecordingHandler { calls: tx, fail }), rx)
    }

    fn config() -> WorkerConfig {
        WorkerConfig::new("test:stream", "test_workers")
            .with_consumer_id("worker-test")
            .with_backoff(Duration::from_secs(1))
    }

    fn read_error() -> Step {
        Err(StreamError::NotConnected)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_after_fixed_backoff_then_delivers_once() {
        let source = ScriptedSource::new(vec![
            read_error(),
            read_error(),
            Ok(Some(StreamMessage::new("1-0", br#"{"email":"b@x.com"}"#.to_vec()))),
        ]);
        let acks = source.acks.clone();
        let (handler, mut calls) = handler(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let started = tokio::time::Instant::now();
        let worker = StreamWorker::new(source, handler, config());
        let task = tokio::spawn(worker.run(shutdown_rx));

        let (payload, at) = calls.recv().await.unwrap();
        assert_eq!(payload, br#"{"email":"b@x.com"}"#.to_vec());
        assert!(at - started >= Duration::from_secs(2));
        assert!(at - started < Duration::from_secs(3));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert!(calls.try_recv().is_err(), "handler must run exactly once");
        assert_eq!(*acks.lock().unwrap(), vec!["1-0".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_error_does_not_stop_loop() {
        let source = ScriptedSource::new(vec![
            Ok(Some(StreamMessage::new("1-0", b"first".to_vec()))),
            Ok(None),
            Ok(Some(StreamMessage::new("2-0", b"second".to_vec()))),
        ]);
        let acks = source.acks.clone();
        let (handler, mut calls) = handler(true);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(StreamWorker::new(source, handler, config()).run(shutdown_rx));

        assert_eq!(calls.recv().await.unwrap().0, b"first".to_vec());
        assert_eq!(calls.recv().await.unwrap().0, b"second".to_vec());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(*acks.lock().unwrap(), vec!["1-0".to_string(), "2-0".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_backoff() {
        let source = ScriptedSource::new(vec![read_error()]);
        let closed = source.closed.clone();
        let (handler, _calls) = handler(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let config = config().with_backoff(Duration::from_secs(3600));
        let worker = StreamWorker::new(source, handler, config);
        let mut state = worker.state();
        let task = tokio::spawn(worker.run(shutdown_rx));

        state.wait_for(|s| *s == ConsumerState::Backoff).await.unwrap();
        let before = tokio::time::Instant::now();
        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert!(tokio::time::Instant::now() - before < Duration::from_secs(1));
        assert_eq!(*state.borrow(), ConsumerState::Closed);
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start_skips_reading() {
        let source = ScriptedSource::new(vec![read_error()]);
        let (handler, _calls) = handler(false);
        let (_shutdown_tx, shutdown_rx) = watch::channel(true);

        let worker = StreamWorker::new(source, handler, config());
        let state = worker.state();
        worker.run(shutdown_rx).await.unwrap();

        assert_eq!(*state.borrow(), ConsumerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_blocked_on_read() {
        let source = ScriptedSource::new(vec![]);
        let closed = source.closed.clone();
        let (handler, _calls) = handler(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = StreamWorker::new(source, handler, config());
        let mut state = worker.state();
        let task = tokio::spawn(worker.run(shutdown_rx));

        state.wait_for(|s| s.is_ready()).await.unwrap();
        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert!(*closed.lock().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_is_retried() {
        let mut source = ScriptedSource::new(vec![Ok(Some(StreamMessage::new(
            "5-0",
            b"a@x.com".to_vec(),
        )))]);
        source.connects = VecDeque::from(vec![Err(StreamError::NotConnected)]);
        let (handler, mut calls) = handler(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let started = tokio::time::Instant::now();
        let task = tokio::spawn(StreamWorker::new(source, handler, config()).run(shutdown_rx));

        let (_, at) = calls.recv().await.unwrap();
        assert!(at - started >= Duration::from_secs(1));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(ConsumerState::ShuttingDown.to_string(), "shutting_down");
        assert_eq!(ConsumerState::Reading.as_ref(), "reading");
        assert!(ConsumerState::Reading.is_ready());
        assert!(!ConsumerState::Backoff.is_ready());
    }
}
