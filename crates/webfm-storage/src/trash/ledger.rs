//! The persisted trash ledger.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use webfm_core::error::AppError;
use webfm_core::result::AppResult;
use webfm_core::types::EntryKind;

use crate::fs::atomic::{publish_replace, write_temp};

/// One trashed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashEntry {
    /// Quarantine id; also the blob's file name.
    pub id: String,
    /// Where the entry lived before it was trashed.
    pub original_relative_path: String,
    /// Final segment of the original path.
    pub original_name: String,
    /// File or folder.
    pub kind: EntryKind,
    /// Total size, recursive for folders.
    pub size_bytes: u64,
    /// When it was trashed.
    pub deleted_at: DateTime<Utc>,
    /// Who trashed it.
    pub deleted_by: String,
}

/// The ledger document: a JSON array of [`TrashEntry`].
///
/// Always rewritten whole; callers serialize read-modify-write cycles.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// A ledger stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read every entry. A missing or empty document means an empty trash.
    pub async fn load(&self) -> AppResult<Vec<TrashEntry>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::from_io(e, "read", "trash ledger")),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Replace the document with `entries`.
    pub async fn save(&self, entries: &[TrashEntry]) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let dir = self
            .path
            .parent()
            .ok_or_else(|| AppError::internal("Trash ledger has no parent directory"))?;
        let temp = write_temp(dir, &bytes).await?;
        publish_replace(&temp, &self.path, "trash ledger").await
    }
}
