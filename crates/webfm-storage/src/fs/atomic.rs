//! Write-to-temp-then-publish helpers.
//!
//! Content is written to a sibling temp file in the destination directory
//! and only then made visible under its real name, so readers never see a
//! partially written file and a crash never truncates existing content.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use webfm_core::error::AppError;
use webfm_core::result::AppResult;

use super::naming::occupied;

/// Prefix of in-flight temp files; listings skip these.
pub const TEMP_PREFIX: &str = ".webfm-tmp-";

/// A fresh temp file path inside `dir`.
pub fn temp_path(dir: &Path) -> PathBuf {
    dir.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4().simple()))
}

/// Write `data` to a new temp file inside `dir` and sync it to disk.
pub async fn write_temp(dir: &Path, data: &[u8]) -> AppResult<PathBuf> {
    let temp = temp_path(dir);
    let result = async {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        Ok::<_, std::io::Error>(())
    }
    .await;

    match result {
        Ok(()) => Ok(temp),
        Err(e) => {
            discard(&temp).await;
            Err(AppError::from_io(e, "write", &dir.display().to_string()))
        }
    }
}

/// Publish `temp` as `target`, failing `AlreadyExists` if `target` is taken.
///
/// A hard link gives a no-clobber publish in one syscall. Filesystems that
/// cannot link fall back to check-then-rename.
pub async fn publish_new(temp: &Path, target: &Path, display: &str) -> AppResult<()> {
    match fs::hard_link(temp, target).await {
        Ok(()) => {
            discard(temp).await;
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            discard(temp).await;
            Err(AppError::already_exists(format!("'{display}' already exists")))
        }
        Err(e) => {
            debug!(error = %e, "Hard link publish unavailable, falling back to rename");
            if occupied(target).await? {
                discard(temp).await;
                return Err(AppError::already_exists(format!("'{display}' already exists")));
            }
            publish_replace(temp, target, display).await
        }
    }
}

/// Publish `temp` as `target`, atomically replacing any previous content.
pub async fn publish_replace(temp: &Path, target: &Path, display: &str) -> AppResult<()> {
    if let Err(e) = fs::rename(temp, target).await {
        discard(temp).await;
        return Err(AppError::from_io(e, "write", display));
    }
    Ok(())
}

/// Best-effort removal of a temp file.
pub async fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %temp.display(), error = %e, "Failed to remove temp file");
        }
    }
}
