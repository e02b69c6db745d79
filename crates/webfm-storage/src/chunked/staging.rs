//! On-disk staging area for chunks of in-flight uploads.
//!
//! Layout under the staging directory:
//!
//! ```text
//! <key>/manifest.json   original name, declared total, generation, start time
//! <key>/000000.part     chunk 0
//! <key>/000001.part     chunk 1
//! <key>/complete.json   result of the last assembly, stamped with its generation
//! ```
//!
//! A generation is one pass of an upload from its first chunk to assembly.
//! The first chunk to arrive while no manifest exists starts a new one, so
//! uploading the same name again never reuses an earlier result.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use webfm_core::error::{AppError, ErrorKind};
use webfm_core::result::AppResult;
use webfm_core::types::FileSystemEntry;

use crate::fs::atomic::{publish_new, publish_replace, write_temp};
use crate::fs::remove_tree;

const MANIFEST: &str = "manifest.json";
const COMPLETE: &str = "complete.json";
const PART_SUFFIX: &str = ".part";

/// What the first chunk of an upload declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Client-side file name.
    pub original_name: String,
    /// Declared number of chunks.
    pub total_chunks: u32,
    /// Identifies this pass of the upload.
    pub generation: String,
    /// When the first chunk arrived.
    pub created_at: DateTime<Utc>,
}

/// Result of a finished assembly, kept for callers that staged a chunk into
/// the same generation and were waiting while it was assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The assembled file.
    pub entry: FileSystemEntry,
    /// Generation that was assembled.
    pub generation: String,
    /// Chunk count the upload was assembled from.
    pub total_chunks: u32,
    /// When assembly finished.
    pub completed_at: DateTime<Utc>,
}

/// Chunk storage keyed by upload key.
#[derive(Debug, Clone)]
pub struct ChunkStaging {
    dir: PathBuf,
}

impl ChunkStaging {
    /// Stage chunks below `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic key for one logical upload.
    ///
    /// The same root, destination and file name always yield the same key,
    /// so a client retrying a chunk lands in the same staging slot.
    pub fn upload_key(root: &Path, destination: &str, original_name: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(root.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(destination.as_bytes());
        hasher.update([0]);
        hasher.update(original_name.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Staging directory of one upload.
    pub fn upload_dir(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Path of one staged chunk.
    pub fn chunk_path(&self, key: &str, index: u32) -> PathBuf {
        self.upload_dir(key).join(format!("{index:06}{PART_SUFFIX}"))
    }

    /// Store chunk `index`, replacing an earlier copy of the same index.
    ///
    /// Returns the generation the chunk was staged into. Fails with
    /// `Validation` if the upload was started with a different declared
    /// total.
    pub async fn store_chunk(
        &self,
        key: &str,
        original_name: &str,
        total_chunks: u32,
        index: u32,
        data: &[u8],
    ) -> AppResult<String> {
        let dir = self.upload_dir(key);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::from_io(e, "create staging directory", key))?;

        let manifest = match self.manifest(key).await? {
            Some(manifest) => manifest,
            None => self.start(key, &dir, original_name, total_chunks).await?,
        };
        if manifest.total_chunks != total_chunks {
            return Err(AppError::validation(format!(
                "Upload of '{original_name}' was started with {} chunks, not {total_chunks}",
                manifest.total_chunks
            )));
        }

        let temp = write_temp(&dir, data).await?;
        publish_replace(&temp, &self.chunk_path(key, index), original_name).await?;
        debug!(
            key,
            index,
            total_chunks,
            generation = %manifest.generation,
            bytes = data.len(),
            "Staged chunk"
        );
        Ok(manifest.generation)
    }

    /// Write the manifest of a new generation.
    ///
    /// Chunks of one upload may race here; the manifest is published without
    /// clobbering, and the losers adopt the winner's generation.
    async fn start(
        &self,
        key: &str,
        dir: &Path,
        original_name: &str,
        total_chunks: u32,
    ) -> AppResult<Manifest> {
        let manifest = Manifest {
            original_name: original_name.to_string(),
            total_chunks,
            generation: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&manifest)?;
        let temp = write_temp(dir, &bytes).await?;
        match publish_new(&temp, &dir.join(MANIFEST), MANIFEST).await {
            Ok(()) => Ok(manifest),
            Err(e) if e.kind == ErrorKind::AlreadyExists => self
                .manifest(key)
                .await?
                .ok_or_else(|| AppError::internal(format!("Manifest of upload {key} vanished"))),
            Err(e) => Err(e),
        }
    }

    /// The manifest of an upload, if it has been started.
    pub async fn manifest(&self, key: &str) -> AppResult<Option<Manifest>> {
        self.read_json(&self.upload_dir(key).join(MANIFEST)).await
    }

    /// Indices of every chunk currently staged.
    pub async fn received_indices(&self, key: &str) -> AppResult<BTreeSet<u32>> {
        let dir = self.upload_dir(key);
        let mut indices = BTreeSet::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(indices),
            Err(e) => return Err(AppError::from_io(e, "list", key)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::from_io(e, "list", key))?
        {
            let name = entry.file_name();
            let index = name
                .to_str()
                .and_then(|n| n.strip_suffix(PART_SUFFIX))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(index) = index {
                indices.insert(index);
            }
        }
        Ok(indices)
    }

    /// Drop the chunks of a finished upload and leave a completion marker.
    pub async fn finish(&self, key: &str, completion: &Completion) -> AppResult<()> {
        let dir = self.upload_dir(key);
        for index in 0..completion.total_chunks {
            remove_tree(&self.chunk_path(key, index)).await?;
        }
        remove_tree(&dir.join(MANIFEST)).await?;
        self.write_json(&dir, COMPLETE, completion).await
    }

    /// The completion marker of `key`, if it records `generation`.
    pub async fn completion(&self, key: &str, generation: &str) -> AppResult<Option<Completion>> {
        let completion: Option<Completion> =
            self.read_json(&self.upload_dir(key).join(COMPLETE)).await?;
        Ok(completion.filter(|c| c.generation == generation))
    }

    /// Forget an upload entirely.
    pub async fn discard(&self, key: &str) -> AppResult<()> {
        remove_tree(&self.upload_dir(key)).await
    }

    /// Remove staging directories not touched for `hours` hours.
    ///
    /// Returns the number of uploads removed.
    pub async fn purge_older_than(&self, hours: u64) -> AppResult<usize> {
        let cutoff = std::time::SystemTime::now()
            .checked_sub(std::time::Duration::from_secs(hours.saturating_mul(3600)))
            .unwrap_or(std::time::UNIX_EPOCH);

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(AppError::from_io(e, "list", "staging area")),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::from_io(e, "list", "staging area"))?
        {
            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable staging entry");
                    continue;
                }
            };
            if modified <= cutoff {
                remove_tree(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, hours, "Purged abandoned uploads");
        }
        Ok(removed)
    }

    async fn write_json<T: Serialize>(&self, dir: &Path, name: &str, value: &T) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let temp = write_temp(dir, &bytes).await?;
        publish_replace(&temp, &dir.join(name), name).await
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> AppResult<Option<T>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::from_io(e, "read", &path.display().to_string())),
        }
    }
}
