//! File read, write, create, rename, move and download handlers.

use axum::Json;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::json;
use tokio_util::io::ReaderStream;

use webfm_core::error::AppError;
use webfm_core::types::FileSystemEntry;
use webfm_storage::{RelativePath, TextFile};

use crate::activity::Activity;
use crate::dto::request::{CreateFileRequest, MoveRequest, PathQuery, RenameRequest, WriteTextRequest};
use crate::dto::response::{ApiResponse, bulk_response};
use crate::error::ApiError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;

/// GET /api/read?path=
pub async fn read_text(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<TextFile>>, ApiError> {
    let rel = RelativePath::sanitize(&query.path);
    let file = state.files.read_text(&rel, &state.text_policy).await?;
    Ok(Json(ApiResponse::ok(file)))
}

/// PUT /api/write
pub async fn write_text(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<WriteTextRequest>,
) -> Result<Json<ApiResponse<FileSystemEntry>>, ApiError> {
    let rel = RelativePath::sanitize(&req.path);
    let entry = state
        .files
        .write_text(&rel, &req.content, &state.text_policy)
        .await?;
    Activity::new("edit")
        .entry(&entry)
        .extra(json!({ "bytes": req.content.len() }))
        .emit();
    Ok(Json(ApiResponse::ok(entry)))
}

/// POST /api/files
pub async fn create_file(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateFileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FileSystemEntry>>), ApiError> {
    let rel = RelativePath::sanitize(&req.path);
    let content = req.content.unwrap_or_default();
    let entry = state.files.create_file(&rel, content.as_bytes()).await?;
    Activity::new("create").entry(&entry).emit();
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(entry))))
}

/// POST /api/rename
pub async fn rename(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<FileSystemEntry>>, ApiError> {
    let rel = RelativePath::sanitize(&req.path);
    let entry = state.files.rename(&rel, &req.new_name).await?;
    Activity::new("rename")
        .entry(&entry)
        .extra(json!({ "from": rel.to_string() }))
        .emit();
    Ok(Json(ApiResponse::ok(entry)))
}

/// POST /api/move
pub async fn move_entries(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<MoveRequest>,
) -> Result<Response, ApiError> {
    let sources: Vec<RelativePath> = req.paths.iter().map(|p| RelativePath::sanitize(p)).collect();
    let destination = RelativePath::sanitize(&req.destination);
    let report = state.files.move_many(&sources, &destination).await?;
    for entry in &report.succeeded {
        Activity::new("move")
            .entry(entry)
            .extra(json!({ "destination": destination.to_string() }))
            .emit();
    }
    Ok(bulk_response(report))
}

/// GET /api/download?path=
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let rel = RelativePath::sanitize(&query.path);
    let (file, entry) = state.files.open_read(&rel).await?;
    let content_type = mime_guess::from_path(&entry.name).first_or_octet_stream();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, entry.size_bytes)
        .header(header::CONTENT_DISPOSITION, content_disposition(&entry.name))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;

    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(name, NON_ALPHANUMERIC);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
