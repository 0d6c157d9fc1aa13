//! Notification Service
//!
//! Issues password reset codes and registration confirmations, triggered
//! over HTTP or by entries on a Redis stream, and delivers them by email.
//!
//! ## Architecture
//!
//! ```text
//! POST /api/forgot, /api/validate        Redis Stream (notifications:requests)
//!        │                                 ↓ (Consumer Group: notification_workers)
//!        │                               StreamWorker<RedisStreamConsumer, NotificationDispatcher>
//!        └──────────────┬──────────────────┘
//!                 NotificationDispatcher  (classify → create → send → mark sent)
//!                       ↓
//!      NotificationService + InMemoryNotificationRepository
//!                       ↓
//!      MailerEmailSender (Handlebars) → SmtpProvider (lettre)
//! ```
//!
//! A cron job sweeps expired notifications; SIGINT/SIGTERM stops the HTTP
//! server, the stream worker and the scheduler in that order.

pub mod config;
pub mod routes;
pub mod sweeper;

use axum_helpers::{ShutdownCoordinator, create_router, serve};
use config::Config;
use core_config::{Environment, FromEnv};
use domain_notifications::{
    InMemoryNotificationRepository, MailerEmailSender, NotificationDispatcher, NotificationService,
    SmtpProvider, handlers,
};
use eyre::{Result, WrapErr};
use routes::{APP_INFO, ReadyState, redis_probe, root_router};
use std::sync::Arc;
use stream_worker::{RedisStreamConsumer, StreamWorker, WorkerConfig, metrics};
use tracing::{error, info, warn};

/// Run the notification service until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is missing or invalid
/// - SMTP or template setup fails
/// - The stream broker URL cannot be parsed
/// - The HTTP server cannot bind or fails while serving
pub async fn run() -> Result<()> {
    // Initialize tracing (env-aware: JSON for prod, pretty for dev)
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    metrics::init_metrics();

    info!(name = %APP_INFO.name, version = %APP_INFO.version, "Starting notification service");

    let config = Config::from_env().wrap_err("Failed to load configuration")?;
    info!(
        environment = ?config.environment,
        address = %config.server.address(),
        smtp = ?config.smtp,
        "Configuration loaded"
    );

    // Email delivery
    let provider =
        SmtpProvider::new(config.smtp.clone()).wrap_err("Failed to configure SMTP provider")?;
    let sender =
        MailerEmailSender::new(provider).wrap_err("Failed to initialize email templates")?;

    // Notification lifecycle
    let service = Arc::new(NotificationService::new(InMemoryNotificationRepository::new()));
    let dispatcher = NotificationDispatcher::new(service.clone(), Arc::new(sender));

    // Stream consumer. Redis is first contacted by the worker, which keeps
    // retrying until it answers.
    let worker_config = WorkerConfig::from(&config.stream);
    info!(
        broker = %config.stream.broker_url,
        stream = %worker_config.stream_name,
        consumer_group = %worker_config.consumer_group,
        consumer_id = %worker_config.consumer_id,
        block_timeout_ms = worker_config.block_timeout_ms,
        backoff_ms = worker_config.backoff.as_millis() as u64,
        "Worker configuration loaded"
    );
    let source = RedisStreamConsumer::open(&config.stream.broker_url, worker_config.clone())
        .wrap_err("Invalid STREAM_BROKER_URL")?;
    let probe_client = redis::Client::open(config.stream.broker_url.as_str())
        .wrap_err("Invalid STREAM_BROKER_URL")?;
    let broker = redis_probe(probe_client).wrap_err("Failed to set up Redis readiness probe")?;
    let worker = StreamWorker::new(source, Arc::new(dispatcher.clone()), worker_config);

    let ready = ReadyState {
        consumer: worker.state(),
        broker,
    };

    // Shutdown on SIGINT/SIGTERM
    let shutdown = ShutdownCoordinator::new();
    let signals = shutdown.clone();
    tokio::spawn(async move {
        signals.wait_for_signal().await;
    });

    let mut sweeper = sweeper::start_sweeper(service, &config.sweep_schedule).await?;

    let worker_handle = tokio::spawn(worker.run(shutdown.subscribe()));

    let router = create_router(handlers::router(dispatcher), root_router(ready));
    let served = serve(router, &config.server, shutdown.wait_for_shutdown())
        .await
        .wrap_err("HTTP server failed");

    if !shutdown.is_shutting_down() {
        warn!("HTTP server stopped without a shutdown signal, stopping remaining tasks");
        shutdown.shutdown();
    }

    match worker_handle.await {
        Ok(Ok(())) => info!("Stream worker stopped"),
        Ok(Err(e)) => error!(error = %e, "Stream worker failed"),
        Err(e) => error!(error = %e, "Stream worker task panicked"),
    }

    if let Err(e) = sweeper.shutdown().await {
        error!(error = %e, "Failed to stop expiry sweeper");
    }

    served?;
    info!("Notification service stopped");
    Ok(())
}
