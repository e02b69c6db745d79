//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let root_reachable = tokio::fs::metadata(state.files.resolver().root())
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);

    Json(ApiResponse::ok(HealthResponse {
        status: if root_reachable { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        root_reachable,
    }))
}
