//! Chunked upload configuration.

use serde::{Deserialize, Serialize};

/// Limits applied to incoming chunked uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum size of a single chunk in bytes (default 10 MiB).
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: u64,
    /// Maximum declared chunk count for one file.
    #[serde(default = "default_max_total_chunks")]
    pub max_total_chunks: u32,
    /// Staging directories untouched for longer than this are purged.
    #[serde(default = "default_staging_expiry_hours")]
    pub staging_expiry_hours: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: default_max_chunk_bytes(),
            max_total_chunks: default_max_total_chunks(),
            staging_expiry_hours: default_staging_expiry_hours(),
        }
    }
}

fn default_max_chunk_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_total_chunks() -> u32 {
    10_000
}

fn default_staging_expiry_hours() -> u64 {
    24
}
