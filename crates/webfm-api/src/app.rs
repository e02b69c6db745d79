//! Application builder: wires router, middleware and state into an Axum app
//! and runs it next to the maintenance scheduler.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use webfm_core::config::AppConfig;
use webfm_core::error::AppError;
use webfm_storage::RootContext;
use webfm_worker::jobs::{StagingCleanupHandler, TrashRetentionHandler};
use webfm_worker::{CronScheduler, JobExecutor};

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_seconds);
    let cors = build_cors_layer(&state.config.server.cors);

    build_router(state)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

/// Runs the webfm server until Ctrl+C.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting webfm server...");

    // ── Step 1: Open the root ────────────────────────────────────
    let root = RootContext::open(&config.storage.root_path, &config.storage.system_dir).await?;
    tracing::info!(root = %root.root().display(), "Serving root directory");

    // ── Step 2: Build state ──────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, root);

    // ── Step 3: Maintenance scheduler ────────────────────────────
    let mut scheduler = if state.config.worker.enabled {
        Some(start_scheduler(&state).await?)
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 4: HTTP server ──────────────────────────────────────
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("webfm server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }

    tracing::info!("webfm server stopped");
    Ok(())
}

/// Registers the maintenance jobs over the state's stores and starts them.
pub async fn start_scheduler(state: &AppState) -> Result<CronScheduler, AppError> {
    let config = &state.config;

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(TrashRetentionHandler::new(
        state.trash.clone(),
        config.trash.retention_days,
    )));
    executor.register(Arc::new(StagingCleanupHandler::new(
        state.uploads.staging().clone(),
        config.upload.staging_expiry_hours,
    )));

    let scheduler = CronScheduler::new(Arc::new(executor)).await?;
    scheduler.register_default_tasks(&config.worker).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
