//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// `?path=` query parameter. Missing means the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathQuery {
    /// Root-relative path.
    #[serde(default)]
    pub path: String,
}

/// Overwrite a text file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WriteTextRequest {
    /// File to overwrite.
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
    /// New content, UTF-8.
    pub content: String,
}

/// Create a new file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFileRequest {
    /// Path of the new file.
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
    /// Initial content; empty when absent.
    #[serde(default)]
    pub content: Option<String>,
}

/// Create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Path of the new folder.
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
}

/// Rename an entry within its folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RenameRequest {
    /// Entry to rename.
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
    /// New final segment.
    #[validate(length(min = 1, max = 255, message = "new_name must be 1-255 characters"))]
    pub new_name: String,
}

/// Move entries into a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoveRequest {
    /// Entries to move.
    #[validate(length(min = 1, message = "at least one path is required"))]
    pub paths: Vec<String>,
    /// Destination folder; empty means the root.
    #[serde(default)]
    pub destination: String,
}

/// A list of paths, for bulk delete.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PathsRequest {
    /// Entries to act on.
    #[validate(length(min = 1, message = "at least one path is required"))]
    pub paths: Vec<String>,
}

/// A list of trash ids.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IdsRequest {
    /// Trash entry ids.
    #[validate(length(min = 1, message = "at least one id is required"))]
    pub ids: Vec<String>,
}

/// Purge trash older than a number of days.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CleanupRequest {
    /// Age threshold in days.
    #[validate(range(max = 36500, message = "days must be at most 36500"))]
    pub days: u32,
}
