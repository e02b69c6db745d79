//! Collision-free name synthesis.

use std::path::Path;

use tokio::fs;

use webfm_core::error::AppError;
use webfm_core::result::AppResult;

use crate::lock::{KeyGuard, LockTable, path_key};

/// How often a claim re-runs the name search after losing a race.
const CLAIM_RETRIES: u32 = 8;

/// Split `name` at its last dot into stem and extension.
///
/// A leading dot does not start an extension, so `.bashrc` is all stem.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Lowercased extension of `name`, if any.
pub fn extension(name: &str) -> Option<String> {
    split_name(name).1.map(str::to_ascii_lowercase)
}

fn with_suffix(name: &str, suffix: &str) -> String {
    match split_name(name) {
        (stem, Some(ext)) => format!("{stem}{suffix}.{ext}"),
        (stem, None) => format!("{stem}{suffix}"),
    }
}

/// `report.txt` → `report_3.txt`.
pub fn numbered(name: &str, n: u32) -> String {
    with_suffix(name, &format!("_{n}"))
}

/// `report.txt` → `report_restored_3.txt`.
pub fn restored(name: &str, n: u32) -> String {
    with_suffix(name, &format!("_restored_{n}"))
}

/// Whether anything (including a dangling symlink) occupies `path`.
pub async fn occupied(path: &Path) -> AppResult<bool> {
    match fs::symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::from_io(e, "stat", &path.display().to_string())),
    }
}

/// Find a name in `dir` that is not taken.
///
/// Returns `name` itself when free, otherwise the first free
/// `variant(name, n)` for `n` in `1..=max_attempts`.
pub async fn free_name(
    dir: &Path,
    name: &str,
    max_attempts: u32,
    variant: fn(&str, u32) -> String,
) -> AppResult<String> {
    if !occupied(&dir.join(name)).await? {
        return Ok(name.to_string());
    }
    for n in 1..=max_attempts {
        let candidate = variant(name, n);
        if !occupied(&dir.join(&candidate)).await? {
            return Ok(candidate);
        }
    }
    Err(AppError::cannot_disambiguate(format!(
        "No free name for '{name}' after {max_attempts} attempts"
    )))
}

/// Find a free name like [`free_name`] and hold its lock.
///
/// The name is checked again once the lock is held. Whoever keeps the guard
/// may take the name without another lock holder taking it first.
pub async fn claim_free_name(
    locks: &LockTable,
    dir: &Path,
    name: &str,
    max_attempts: u32,
    variant: fn(&str, u32) -> String,
) -> AppResult<(String, KeyGuard)> {
    for _ in 0..CLAIM_RETRIES {
        let candidate = free_name(dir, name, max_attempts, variant).await?;
        let target = dir.join(&candidate);
        let guard = locks.write(&path_key(&target)).await;
        if !occupied(&target).await? {
            return Ok((candidate, guard));
        }
    }
    Err(AppError::cannot_disambiguate(format!(
        "Names for '{name}' kept being taken while choosing one"
    )))
}
