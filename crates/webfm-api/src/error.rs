//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use webfm_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// An [`AppError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::PathEscape | ErrorKind::NotReadable | ErrorKind::NotWritable => {
            StatusCode::FORBIDDEN
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists | ErrorKind::NameInUse | ErrorKind::CannotDisambiguate => {
            StatusCode::CONFLICT
        }
        ErrorKind::InvalidName
        | ErrorKind::Validation
        | ErrorKind::SelfMove
        | ErrorKind::RecursiveMove
        | ErrorKind::ParentMissing => StatusCode::BAD_REQUEST,
        ErrorKind::UnsupportedType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::ChunkMissing => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Io
        | ErrorKind::Configuration
        | ErrorKind::Serialization
        | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(err.kind);

        if err.kind == ErrorKind::PathEscape {
            tracing::warn!(security = true, error = %err.message, "Rejected path outside root");
        } else if status.is_server_error() {
            match &err.source {
                Some(source) => {
                    tracing::error!(kind = %err.kind, error = %err.message, source = %source, "Request failed")
                }
                None => tracing::error!(kind = %err.kind, error = %err.message, "Request failed"),
            }
        }

        let body = ApiErrorResponse {
            error: err.kind.to_string(),
            message: err.message,
        };

        (status, Json(body)).into_response()
    }
}
