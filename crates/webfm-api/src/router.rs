//! Route definitions for the webfm HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with every route and the request logger.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.storage.max_upload_size_bytes).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(browse_routes())
        .merge(file_routes())
        .merge(upload_routes())
        .merge(trash_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

fn browse_routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(handlers::browse::list))
        .route("/info", get(handlers::browse::info))
}

fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/read", get(handlers::file::read_text))
        .route("/write", put(handlers::file::write_text))
        .route("/files", post(handlers::file::create_file))
        .route("/folders", post(handlers::folder::create_folder))
        .route("/rename", post(handlers::file::rename))
        .route("/move", post(handlers::file::move_entries))
        .route("/download", get(handlers::file::download))
}

fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload", post(handlers::upload::upload_chunk))
}

fn trash_routes() -> Router<AppState> {
    Router::new()
        .route("/delete", post(handlers::trash::trash_entries))
        .route("/trash", get(handlers::trash::list_trash))
        .route("/trash/restore", post(handlers::trash::restore))
        .route("/trash/delete", post(handlers::trash::delete_permanently))
        .route("/trash/empty", post(handlers::trash::empty))
        .route("/trash/cleanup", post(handlers::trash::cleanup))
}
