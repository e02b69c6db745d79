//! Directory listing and entry info handlers.

use axum::Json;
use axum::extract::{Query, State};

use webfm_core::types::FileSystemEntry;
use webfm_storage::{Listing, RelativePath};

use crate::dto::request::PathQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/list?path=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<Listing>>, ApiError> {
    let rel = RelativePath::sanitize(&query.path);
    let listing = state.lister.list(&rel).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// GET /api/info?path=
pub async fn info(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<FileSystemEntry>>, ApiError> {
    let rel = RelativePath::sanitize(&query.path);
    let entry = state.files.stat(&rel).await?;
    Ok(Json(ApiResponse::ok(entry)))
}
