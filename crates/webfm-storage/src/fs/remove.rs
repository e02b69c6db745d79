//! Depth-first recursive removal.

use std::path::{Path, PathBuf};

use tokio::fs;

use webfm_core::error::AppError;
use webfm_core::result::AppResult;

/// Remove `path` and everything below it, children before parents.
///
/// Symlinks are unlinked, never followed. A failure stops the walk and
/// leaves the remaining tree intact below every directory still present.
/// A missing `path` is not an error.
pub async fn remove_tree(path: &Path) -> AppResult<()> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(AppError::from_io(e, "delete", &path.display().to_string())),
    };
    if !meta.is_dir() {
        return remove_file(path).await;
    }

    // (directory, children already pushed)
    let mut stack: Vec<(PathBuf, bool)> = vec![(path.to_path_buf(), false)];
    while let Some((dir, expanded)) = stack.pop() {
        if expanded {
            fs::remove_dir(&dir)
                .await
                .map_err(|e| AppError::from_io(e, "delete", &dir.display().to_string()))?;
            continue;
        }

        stack.push((dir.clone(), true));
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| AppError::from_io(e, "list", &dir.display().to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::from_io(e, "list", &dir.display().to_string()))?
        {
            let child = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AppError::from_io(e, "stat", &child.display().to_string()))?;
            if file_type.is_dir() {
                stack.push((child, false));
            } else {
                remove_file(&child).await?;
            }
        }
    }
    Ok(())
}

async fn remove_file(path: &Path) -> AppResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::from_io(e, "delete", &path.display().to_string())),
    }
}

/// Total size in bytes of the files under `path`, without following symlinks.
pub async fn tree_size(path: &Path) -> AppResult<u64> {
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];
    while let Some(current) = stack.pop() {
        let meta = fs::symlink_metadata(&current)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &current.display().to_string()))?;
        if !meta.is_dir() {
            total += meta.len();
            continue;
        }
        let mut entries = fs::read_dir(&current)
            .await
            .map_err(|e| AppError::from_io(e, "list", &current.display().to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::from_io(e, "list", &current.display().to_string()))?
        {
            stack.push(entry.path());
        }
    }
    Ok(total)
}
