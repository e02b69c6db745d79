//! Chunked multipart upload handler.

use axum::Json;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use bytes::Bytes;
use serde_json::json;

use webfm_core::error::AppError;
use webfm_storage::{ChunkUpload, UploadProgress};

use crate::activity::Activity;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Multipart fields of one chunk request.
#[derive(Debug, Default)]
struct ChunkForm {
    file_name: Option<String>,
    original_name: Option<String>,
    chunk_index: Option<u32>,
    total_chunks: Option<u32>,
    path: Option<String>,
    relative_path: Option<String>,
    data: Option<Bytes>,
}

impl ChunkForm {
    /// A request without chunk fields is a single-chunk upload.
    fn into_upload(self) -> Result<ChunkUpload, AppError> {
        let data = self
            .data
            .ok_or_else(|| AppError::validation("file is required"))?;
        let original_name = self
            .original_name
            .or(self.file_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::validation("original_name is required"))?;

        Ok(ChunkUpload {
            original_name,
            chunk_index: self.chunk_index.unwrap_or(0),
            total_chunks: self.total_chunks.unwrap_or(1),
            target_dir: self.path.unwrap_or_default(),
            relative_path: self.relative_path.filter(|p| !p.trim().is_empty()),
            data,
        })
    }
}

/// POST /api/upload
pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadProgress>>, ApiError> {
    let mut form = ChunkForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(String::from);
                form.data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Read error: {e}")))?,
                );
            }
            "original_name" => form.original_name = Some(text(field).await?),
            "chunk_index" => form.chunk_index = Some(number(&name, field).await?),
            "total_chunks" => form.total_chunks = Some(number(&name, field).await?),
            "path" => form.path = Some(text(field).await?),
            "relative_path" => form.relative_path = Some(text(field).await?),
            _ => {}
        }
    }

    let upload = form.into_upload()?;
    let chunk_index = upload.chunk_index;
    let total_chunks = upload.total_chunks;
    let progress = state.uploads.accept_chunk(upload).await?;

    match &progress {
        UploadProgress::Finished { entry } => Activity::new("upload")
            .entry(entry)
            .extra(json!({ "chunks": total_chunks }))
            .emit(),
        UploadProgress::Pending { received, total } => tracing::debug!(
            chunk_index,
            received,
            total,
            "Chunk staged"
        ),
    }

    Ok(Json(ApiResponse::ok(progress)))
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Read error: {e}")))
}

async fn number(name: &str, field: Field<'_>) -> Result<u32, AppError> {
    let raw = text(field).await?;
    raw.trim()
        .parse()
        .map_err(|_| AppError::validation(format!("{name} must be a non-negative integer")))
}
