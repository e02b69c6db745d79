//! Folder creation handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use webfm_core::types::FileSystemEntry;
use webfm_storage::RelativePath;

use crate::activity::Activity;
use crate::dto::request::CreateFolderRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// POST /api/folders
pub async fn create_folder(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FileSystemEntry>>), ApiError> {
    let rel = RelativePath::sanitize(&req.path);
    let entry = state.files.create_folder(&rel).await?;
    Activity::new("create").entry(&entry).emit();
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}
