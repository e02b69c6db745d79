//! Trash configuration.

use serde::{Deserialize, Serialize};

/// Soft-delete retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// Items older than this many days are purged by the retention job.
    /// `0` disables automatic purging.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// How many `_restored_N` candidates a restore tries before giving up.
    #[serde(default = "default_restore_attempts")]
    pub restore_attempts: u32,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            restore_attempts: default_restore_attempts(),
        }
    }
}

fn default_retention_days() -> u32 {
    30
}

fn default_restore_attempts() -> u32 {
    100
}
