//! Trash retention and abandoned upload cleanup job handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use webfm_storage::{ChunkStaging, TrashStore};

use crate::executor::{JobExecutionError, JobHandler};

/// Job type of [`TrashRetentionHandler`].
pub const TRASH_RETENTION: &str = "trash_retention";

/// Job type of [`StagingCleanupHandler`].
pub const STAGING_CLEANUP: &str = "staging_cleanup";

/// Permanently deletes trash older than the retention period
#[derive(Debug)]
pub struct TrashRetentionHandler {
    /// Trash store
    trash: Arc<TrashStore>,
    /// Retention in days; 0 disables the job
    retention_days: u32,
}

impl TrashRetentionHandler {
    /// Create a new trash retention handler
    pub fn new(trash: Arc<TrashStore>, retention_days: u32) -> Self {
        Self {
            trash,
            retention_days,
        }
    }
}

#[async_trait]
impl JobHandler for TrashRetentionHandler {
    fn job_type(&self) -> &str {
        TRASH_RETENTION
    }

    async fn execute(&self) -> Result<Option<Value>, JobExecutionError> {
        if self.retention_days == 0 {
            tracing::debug!("Trash retention disabled");
            return Ok(None);
        }

        let report = self
            .trash
            .cleanup_older_than(self.retention_days)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Trash cleanup failed: {e}")))?;

        for failure in &report.failed {
            tracing::warn!(id = %failure.item, error = %failure.message, "Could not purge trashed item");
        }

        Ok(Some(serde_json::json!({
            "task": TRASH_RETENTION,
            "retention_days": self.retention_days,
            "purged": report.succeeded.len(),
            "failed": report.failed.len(),
        })))
    }
}

/// Removes chunk staging directories abandoned by clients
#[derive(Debug)]
pub struct StagingCleanupHandler {
    /// Staging area
    staging: ChunkStaging,
    /// Age in hours after which an upload counts as abandoned
    expiry_hours: u64,
}

impl StagingCleanupHandler {
    /// Create a new staging cleanup handler
    pub fn new(staging: ChunkStaging, expiry_hours: u64) -> Self {
        Self {
            staging,
            expiry_hours,
        }
    }
}

#[async_trait]
impl JobHandler for StagingCleanupHandler {
    fn job_type(&self) -> &str {
        STAGING_CLEANUP
    }

    async fn execute(&self) -> Result<Option<Value>, JobExecutionError> {
        let removed = self.staging.purge_older_than(self.expiry_hours).await?;
        Ok(Some(serde_json::json!({
            "task": STAGING_CLEANUP,
            "removed_uploads": removed,
        })))
    }
}
