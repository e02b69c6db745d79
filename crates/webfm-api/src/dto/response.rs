//! Response DTOs.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use webfm_core::types::BulkReport;
use webfm_storage::{TrashEntry, TrashSummary};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Envelope for a bulk result: `207 Multi-Status` when some items failed.
pub fn bulk_response<T: Serialize>(report: BulkReport<T>) -> Response {
    let status = if report.is_partial() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };
    (status, Json(ApiResponse::ok(report))).into_response()
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Version.
    pub version: String,
    /// Whether the root directory can be reached.
    pub root_reachable: bool,
}

/// Trash contents plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct TrashListing {
    /// Newest first.
    pub entries: Vec<TrashEntry>,
    /// Count and combined size.
    pub summary: TrashSummary,
}
