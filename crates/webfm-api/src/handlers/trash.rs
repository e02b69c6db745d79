//! Trash handlers: soft delete, listing, restore and purge.

use axum::Json;
use axum::extract::State;
use axum::response::Response;
use serde_json::json;

use webfm_storage::RelativePath;

use crate::activity::Activity;
use crate::dto::request::{CleanupRequest, IdsRequest, PathsRequest};
use crate::dto::response::{ApiResponse, TrashListing, bulk_response};
use crate::error::ApiError;
use crate::extractors::{ActingUser, ValidatedJson};
use crate::state::AppState;

/// POST /api/delete
pub async fn trash_entries(
    State(state): State<AppState>,
    user: ActingUser,
    ValidatedJson(req): ValidatedJson<PathsRequest>,
) -> Result<Response, ApiError> {
    let paths: Vec<RelativePath> = req.paths.iter().map(|p| RelativePath::sanitize(p)).collect();
    let report = state.trash.trash(&paths, user.name()).await?;
    for entry in &report.succeeded {
        Activity::new("delete")
            .trashed(entry)
            .extra(json!({ "id": entry.id, "deleted_by": entry.deleted_by }))
            .emit();
    }
    Ok(bulk_response(report))
}

/// GET /api/trash
pub async fn list_trash(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TrashListing>>, ApiError> {
    let entries = state.trash.list().await?;
    let summary = state.trash.summary().await?;
    Ok(Json(ApiResponse::ok(TrashListing { entries, summary })))
}

/// POST /api/trash/restore
pub async fn restore(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<IdsRequest>,
) -> Result<Response, ApiError> {
    let report = state.trash.restore(&req.ids).await?;
    for entry in &report.succeeded {
        Activity::new("restore").entry(entry).emit();
    }
    Ok(bulk_response(report))
}

/// POST /api/trash/delete
pub async fn delete_permanently(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<IdsRequest>,
) -> Result<Response, ApiError> {
    let report = state.trash.delete_permanently(&req.ids).await?;
    for id in &report.succeeded {
        Activity::new("purge").extra(json!({ "id": id })).emit();
    }
    Ok(bulk_response(report))
}

/// POST /api/trash/empty
pub async fn empty(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state.trash.empty_all().await?;
    Activity::new("empty_trash")
        .extra(json!({ "purged": report.succeeded.len(), "failed": report.failed.len() }))
        .emit();
    Ok(bulk_response(report))
}

/// POST /api/trash/cleanup
pub async fn cleanup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CleanupRequest>,
) -> Result<Response, ApiError> {
    let report = state.trash.cleanup_older_than(req.days).await?;
    Activity::new("cleanup_trash")
        .extra(json!({ "days": req.days, "purged": report.succeeded.len() }))
        .emit();
    Ok(bulk_response(report))
}
