//! Prometheus metrics for stream workers

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder.
///
/// Call once at startup. Later calls are no-ops; a failure to install (another
/// recorder already present) is logged and metrics rendering stays empty.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_ok() {
                info!("Prometheus metrics initialized");
            }
        }
        Err(e) => warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Per-worker metric emitter labelled by stream and handler.
#[derive(Clone, Debug)]
pub struct StreamMetrics {
    stream_name: String,
    handler_name: String,
}

impl StreamMetrics {
    pub fn new(stream_name: impl Into<String>, handler_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            handler_name: handler_name.into(),
        }
    }

    pub fn message_received(&self) {
        counter!(
            "stream_worker_messages_received_total",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone()
        )
        .increment(1);
    }

    pub fn message_handled(&self, success: bool, duration: Duration) {
        let status = if success { "success" } else { "failed" };
        counter!(
            "stream_worker_messages_handled_total",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone(),
            "status" => status
        )
        .increment(1);

        histogram!(
            "stream_worker_handle_duration_seconds",
            "stream" => self.stream_name.clone(),
            "handler" => self.handler_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn read_error(&self) {
        counter!(
            "stream_worker_read_errors_total",
            "stream" => self.stream_name.clone()
        )
        .increment(1);
    }
}
