//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Scheduled maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the scheduler is started.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression (with seconds) for trash retention cleanup.
    #[serde(default = "default_trash_cleanup_cron")]
    pub trash_cleanup_cron: String,
    /// Cron expression (with seconds) for abandoned chunk staging cleanup.
    #[serde(default = "default_staging_cleanup_cron")]
    pub staging_cleanup_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            trash_cleanup_cron: default_trash_cleanup_cron(),
            staging_cleanup_cron: default_staging_cleanup_cron(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_trash_cleanup_cron() -> String {
    "0 30 3 * * *".to_string()
}

fn default_staging_cleanup_cron() -> String {
    "0 0 * * * *".to_string()
}
