//! Root directory configuration.

use serde::{Deserialize, Serialize};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// The single directory every operation is confined to.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Name of the reserved top-level directory inside the root that holds
    /// the trash quarantine, the trash ledger and the chunk staging area.
    ///
    /// Keeping it inside the root keeps every rename on one filesystem.
    #[serde(default = "default_system_dir")]
    pub system_dir: String,
    /// Maximum request body size in bytes for uploads (default 64 MB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            system_dir: default_system_dir(),
            max_upload_size_bytes: default_max_upload(),
        }
    }
}

fn default_root_path() -> String {
    "./data/files".to_string()
}

fn default_system_dir() -> String {
    ".webfm".to_string()
}

fn default_max_upload() -> u64 {
    67_108_864 // 64 MB
}
