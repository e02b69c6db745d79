//! Trash operations over the quarantine area and its ledger.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use webfm_core::error::AppError;
use webfm_core::result::AppResult;
use webfm_core::types::{BulkReport, EntryKind, FileSystemEntry};

use super::ledger::{Ledger, TrashEntry};
use crate::fs::describe;
use crate::fs::naming::{claim_free_name, occupied, restored};
use crate::fs::remove::{remove_tree, tree_size};
use crate::lock::{LockTable, path_key};
use crate::path::{PathResolver, RelativePath};

/// Aggregate numbers for the trash view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrashSummary {
    /// Number of trashed entries.
    pub count: usize,
    /// Combined size of every trashed entry.
    pub total_size_bytes: u64,
}

/// Reversible delete.
///
/// Trashing renames an entry into the quarantine area under a fresh id and
/// records it in the ledger. Every ledger mutation holds one mutex for its
/// whole read-modify-write cycle. Moving an entry back out claims its name
/// in the lock table shared with [`FileStore`](crate::FileStore).
#[derive(Debug, Clone)]
pub struct TrashStore {
    resolver: PathResolver,
    ledger: Ledger,
    quarantine: PathBuf,
    restore_attempts: u32,
    locks: LockTable,
    write_lock: Arc<Mutex<()>>,
}

impl TrashStore {
    /// Create a store using the root's quarantine area and ledger.
    pub fn new(resolver: PathResolver, locks: LockTable, restore_attempts: u32) -> Self {
        let ctx = resolver.context();
        let ledger = Ledger::new(ctx.ledger_path());
        let quarantine = ctx.quarantine_dir();
        Self {
            resolver,
            ledger,
            quarantine,
            restore_attempts,
            locks,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Move each path into quarantine.
    pub async fn trash(
        &self,
        paths: &[RelativePath],
        deleted_by: &str,
    ) -> AppResult<BulkReport<TrashEntry>> {
        let _lock = self.write_lock.lock().await;
        let mut entries = self.ledger.load().await?;

        let mut report = BulkReport::new();
        for rel in paths {
            let result = self.trash_one(rel, deleted_by).await;
            if let Ok(entry) = &result {
                entries.push(entry.clone());
            }
            report.record(rel.to_string(), result);
        }

        if !report.succeeded.is_empty() {
            if let Err(e) = self.ledger.save(&entries).await {
                error!(error = %e, "Failed to record trashed entries, moving them back");
                self.roll_back(&report.succeeded).await;
                return Err(e);
            }
        }
        report.into_result()
    }

    async fn trash_one(&self, rel: &RelativePath, deleted_by: &str) -> AppResult<TrashEntry> {
        let source = self.resolver.resolve_entry(rel).await?;
        let meta = fs::symlink_metadata(&source)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &rel.to_string()))?;
        let size_bytes = tree_size(&source).await?;

        let id = Uuid::new_v4().simple().to_string();
        fs::rename(&source, self.quarantine.join(&id))
            .await
            .map_err(|e| AppError::from_io(e, "trash", &rel.to_string()))?;

        info!(path = %rel, id, "Moved entry to trash");
        Ok(TrashEntry {
            id,
            original_relative_path: rel.to_string(),
            original_name: rel.name().unwrap_or_default().to_string(),
            kind: EntryKind::from_metadata(&meta),
            size_bytes,
            deleted_at: Utc::now(),
            deleted_by: deleted_by.to_string(),
        })
    }

    async fn roll_back(&self, trashed: &[TrashEntry]) {
        for entry in trashed {
            let original = RelativePath::sanitize(&entry.original_relative_path);
            let target = match self.resolver.resolve_new(&original).await {
                Ok(target) => target,
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "Cannot move trashed entry back");
                    continue;
                }
            };
            let _claim = self.locks.write(&path_key(&target)).await;
            match occupied(&target).await {
                Ok(false) => {}
                Ok(true) => {
                    warn!(id = %entry.id, "Original path was taken, leaving entry in trash");
                    continue;
                }
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "Cannot move trashed entry back");
                    continue;
                }
            }
            if let Err(e) = fs::rename(self.quarantine.join(&entry.id), &target).await {
                warn!(id = %entry.id, error = %e, "Cannot move trashed entry back");
            }
        }
    }

    /// Every trashed entry, most recently deleted first.
    pub async fn list(&self) -> AppResult<Vec<TrashEntry>> {
        let mut entries = self.ledger.load().await?;
        entries.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(entries)
    }

    /// Count and total size of the trash.
    pub async fn summary(&self) -> AppResult<TrashSummary> {
        let entries = self.ledger.load().await?;
        Ok(TrashSummary {
            count: entries.len(),
            total_size_bytes: entries.iter().map(|e| e.size_bytes).sum(),
        })
    }

    /// Move each trashed entry back to where it came from.
    ///
    /// An occupied original path is resolved by restoring under a
    /// `_restored_N` name. A row whose blob has vanished is dropped and
    /// reported as `NotFound`.
    pub async fn restore(&self, ids: &[String]) -> AppResult<BulkReport<FileSystemEntry>> {
        let _lock = self.write_lock.lock().await;
        let mut entries = self.ledger.load().await?;
        let before = entries.len();

        let mut report = BulkReport::new();
        for id in ids {
            let result = self.restore_one(&mut entries, id).await;
            report.record(id.clone(), result);
        }

        if entries.len() != before {
            self.ledger.save(&entries).await?;
        }
        report.into_result()
    }

    async fn restore_one(
        &self,
        entries: &mut Vec<TrashEntry>,
        id: &str,
    ) -> AppResult<FileSystemEntry> {
        let pos = find(entries, id)?;
        let blob = self.quarantine.join(id);
        if !occupied(&blob).await? {
            entries.remove(pos);
            warn!(id, "Dropped trash record whose content is gone");
            return Err(AppError::not_found(format!(
                "Trashed item {id} no longer exists"
            )));
        }

        let original = RelativePath::sanitize(&entries[pos].original_relative_path);
        let (Some(parent), Some(name)) = (original.parent(), original.name()) else {
            return Err(AppError::invalid_name(format!(
                "Trashed item {id} has no original location"
            )));
        };

        let parent_abs = self.resolver.ensure_dir(&parent).await?;
        let (final_name, _claim) = claim_free_name(
            &self.locks,
            &parent_abs,
            name,
            self.restore_attempts,
            restored,
        )
        .await?;
        let target = parent_abs.join(&final_name);
        fs::rename(&blob, &target)
            .await
            .map_err(|e| AppError::from_io(e, "restore", &original.to_string()))?;
        entries.remove(pos);

        let rel = parent.join(&final_name);
        info!(id, path = %rel, "Restored entry from trash");
        describe(&rel, &target).await
    }

    /// Remove trashed entries for good. A row without a blob still counts.
    pub async fn delete_permanently(&self, ids: &[String]) -> AppResult<BulkReport<String>> {
        let _lock = self.write_lock.lock().await;
        let mut entries = self.ledger.load().await?;
        self.delete_locked(&mut entries, ids).await
    }

    /// Permanently delete everything in the trash.
    pub async fn empty_all(&self) -> AppResult<BulkReport<String>> {
        let _lock = self.write_lock.lock().await;
        let mut entries = self.ledger.load().await?;
        let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        self.delete_locked(&mut entries, &ids).await
    }

    /// Permanently delete entries trashed at least `days` days ago.
    pub async fn cleanup_older_than(&self, days: u32) -> AppResult<BulkReport<String>> {
        let _lock = self.write_lock.lock().await;
        let mut entries = self.ledger.load().await?;
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let ids: Vec<String> = entries
            .iter()
            .filter(|e| e.deleted_at <= cutoff)
            .map(|e| e.id.clone())
            .collect();
        let report = self.delete_locked(&mut entries, &ids).await?;
        if !report.succeeded.is_empty() {
            info!(days, removed = report.succeeded.len(), "Cleaned up old trash");
        }
        Ok(report)
    }

    /// Caller must hold `write_lock`.
    async fn delete_locked(
        &self,
        entries: &mut Vec<TrashEntry>,
        ids: &[String],
    ) -> AppResult<BulkReport<String>> {
        let before = entries.len();
        let mut report = BulkReport::new();
        for id in ids {
            let result = async {
                let pos = find(entries, id)?;
                remove_tree(&self.quarantine.join(id)).await?;
                entries.remove(pos);
                info!(id, "Permanently deleted trashed entry");
                Ok::<_, AppError>(id.clone())
            }
            .await;
            report.record(id.clone(), result);
        }

        if entries.len() != before {
            self.ledger.save(entries).await?;
        }
        report.into_result()
    }
}

/// Locate a ledger row, rejecting ids that could not have been issued.
fn find(entries: &[TrashEntry], id: &str) -> AppResult<usize> {
    if Uuid::try_parse(id).is_err() {
        return Err(AppError::validation(format!("'{id}' is not a trash id")));
    }
    entries
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| AppError::not_found(format!("Trashed item {id} not found")))
}
