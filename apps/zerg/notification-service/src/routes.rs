//! Top-level operational routes: liveness, readiness and metrics

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use axum_helpers::{HealthCheckFuture, health_router, run_health_checks};
use core_config::AppInfo;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use serde_json::json;
use std::sync::Arc;
use stream_worker::{ConsumerState, render_metrics};
use tokio::sync::watch;

/// Identity reported by `GET /health`.
pub const APP_INFO: AppInfo = AppInfo {
    name: "notification-service",
    version: env!("CARGO_PKG_VERSION"),
};

/// Produces a fresh broker check per readiness request.
pub type BrokerProbe = Arc<dyn Fn() -> HealthCheckFuture<'static> + Send + Sync>;

#[derive(Clone)]
pub struct ReadyState {
    pub consumer: watch::Receiver<ConsumerState>,
    pub broker: BrokerProbe,
}

/// Redis `PING` over its own connection, so a blocked stream read does not
/// hold it up. The connection is opened on the first probe.
pub fn redis_probe(client: redis::Client) -> redis::RedisResult<BrokerProbe> {
    let redis = ConnectionManager::new_lazy_with_config(client, ConnectionManagerConfig::new())?;
    Ok(Arc::new(move || -> HealthCheckFuture<'static> {
        let mut conn = redis.clone();
        Box::pin(async move {
            let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
            pong.map(|_| ()).map_err(|e| e.to_string())
        })
    }))
}

/// `/health`, `/ready` and `/metrics`, merged at the root of the service.
pub fn root_router(ready: ReadyState) -> Router {
    health_router(APP_INFO)
        .merge(
            Router::new()
                .route("/ready", get(ready_handler))
                .with_state(ready),
        )
        .route("/metrics", get(metrics_handler))
}

/// Ready while the stream consumer is reading and the broker answers.
async fn ready_handler(State(state): State<ReadyState>) -> impl IntoResponse {
    let consumer = *state.consumer.borrow();
    let consumer_check: HealthCheckFuture<'static> = Box::pin(async move {
        if consumer.is_ready() {
            Ok(())
        } else {
            Err(format!("stream consumer is {}", consumer))
        }
    });

    let checks = vec![("stream_consumer", consumer_check), ("redis", (state.broker)())];
    let (status, Json(mut body)) = run_health_checks(checks).await;
    let label: &str = consumer.as_ref();
    body["consumer_state"] = json!(label);
    (status, Json(body))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render_metrics(),
    )
}
