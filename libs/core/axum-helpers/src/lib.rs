//! # Axum Helpers
//!
//! Shared HTTP plumbing for the zerg services.
//!
//! ## Modules
//!
//! - **[`server`]**: Router assembly, health checks, graceful shutdown
//! - **[`errors`]**: Structured error responses with error codes
//! - **[`extractors`]**: Validated JSON extractor
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum_helpers::server::{create_router, health_router, serve, ShutdownCoordinator};
//! use core_config::{AppInfo, server::ServerConfig};
//!
//! const APP: AppInfo = AppInfo { name: "notification-service", version: "0.1.0" };
//!
//! let shutdown = ShutdownCoordinator::default();
//! let router = create_router(api_routes, health_router(APP));
//! serve(router, &ServerConfig::default(), shutdown.wait_for_shutdown()).await?;
//! ```

pub mod errors;
pub mod extractors;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::ValidatedJson;
pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_router, health_router,
    run_health_checks, serve,
};
