//! Chunk assembler: accepts chunks and builds the final file exactly once.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use webfm_core::config::upload::UploadConfig;
use webfm_core::error::{AppError, ErrorKind};
use webfm_core::result::AppResult;
use webfm_core::types::FileSystemEntry;

use super::staging::{ChunkStaging, Completion};
use crate::fs::atomic::{discard, publish_new, temp_path};
use crate::fs::describe;
use crate::fs::naming::{claim_free_name, numbered, occupied};
use crate::lock::{LockTable, path_key};
use crate::path::{PathResolver, RelativePath, validate_name};

/// Copy buffer used while concatenating chunks.
const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// How many `_N` names a folder upload tries before giving up.
const FOLDER_UPLOAD_ATTEMPTS: u32 = 10_000;

/// How often a folder upload picks a new name after losing its chosen one.
const PUBLISH_RETRIES: u32 = 4;

/// One chunk as received from the transport.
#[derive(Debug, Clone)]
pub struct ChunkUpload {
    /// Client-side file name.
    pub original_name: String,
    /// Zero-based chunk position.
    pub chunk_index: u32,
    /// Declared number of chunks.
    pub total_chunks: u32,
    /// Destination directory, as sent by the client.
    pub target_dir: String,
    /// Folder path below `target_dir` for folder uploads.
    pub relative_path: Option<String>,
    /// Chunk payload.
    pub data: Bytes,
}

/// Outcome of accepting one chunk.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum UploadProgress {
    /// More chunks are expected.
    Pending {
        /// Distinct chunk indices staged so far.
        received: usize,
        /// Declared number of chunks.
        total: u32,
    },
    /// The file has been assembled.
    Finished {
        /// The assembled file.
        entry: FileSystemEntry,
    },
}

impl UploadProgress {
    /// Whether the upload is complete.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}

/// Size limits applied to incoming chunks.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Maximum bytes per chunk.
    pub max_chunk_bytes: u64,
    /// Maximum declared chunk count.
    pub max_total_chunks: u32,
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            max_chunk_bytes: config.max_chunk_bytes,
            max_total_chunks: config.max_total_chunks,
        }
    }
}

/// Where an upload's file ends up.
struct Destination {
    /// Directory below the root the file is placed in.
    dir: RelativePath,
    /// Whether the directory is created on demand and name clashes are
    /// resolved by renaming.
    folder_upload: bool,
}

/// Collects chunks per upload key and assembles them once all are present.
///
/// Chunk writes for one key share a read lock; the completeness check and
/// assembly take the write lock, so exactly one caller assembles. Callers
/// that staged into the generation being assembled get its result instead
/// of a second write.
#[derive(Debug, Clone)]
pub struct ChunkAssembler {
    resolver: PathResolver,
    staging: ChunkStaging,
    limits: UploadLimits,
    locks: LockTable,
}

impl ChunkAssembler {
    /// Create an assembler staging chunks in the root's system area.
    ///
    /// `locks` must be the table the other stores of this root use, so the
    /// final publish cannot race a move or restore onto the same name.
    pub fn new(resolver: PathResolver, locks: LockTable, limits: UploadLimits) -> Self {
        let staging = ChunkStaging::new(resolver.context().staging_dir());
        Self {
            resolver,
            staging,
            limits,
            locks,
        }
    }

    /// The staging area, for maintenance jobs.
    pub fn staging(&self) -> &ChunkStaging {
        &self.staging
    }

    /// Accept one chunk and assemble the file if it was the last one missing.
    pub async fn accept_chunk(&self, upload: ChunkUpload) -> AppResult<UploadProgress> {
        self.check_limits(&upload)?;
        let name = upload.original_name.as_str();
        let destination = self.destination(&upload).await?;
        let key = ChunkStaging::upload_key(
            self.resolver.root(),
            &destination.dir.to_string(),
            name,
        );
        let total = upload.total_chunks;

        let generation = {
            let _guard = self.locks.read(&key).await;
            self.staging
                .store_chunk(&key, name, total, upload.chunk_index, &upload.data)
                .await?
        };

        let _guard = self.locks.write(&key).await;
        if let Some(done) = self.staging.completion(&key, &generation).await? {
            debug!(key, index = upload.chunk_index, "Chunk raced the assembly of its upload");
            return Ok(UploadProgress::Finished { entry: done.entry });
        }

        let received = self.staging.received_indices(&key).await?;
        if !(0..total).all(|index| received.contains(&index)) {
            return Ok(UploadProgress::Pending {
                received: received.len(),
                total,
            });
        }

        let entry = match self.assemble(&key, name, total, &destination).await {
            Ok(entry) => entry,
            Err(e) if e.kind == ErrorKind::AlreadyExists => {
                self.staging.discard(&key).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let completion = Completion {
            entry: entry.clone(),
            generation,
            total_chunks: total,
            completed_at: Utc::now(),
        };
        if let Err(e) = self.staging.finish(&key, &completion).await {
            warn!(key, error = %e, "Failed to clear staged chunks after assembly");
        }

        Ok(UploadProgress::Finished { entry })
    }

    fn check_limits(&self, upload: &ChunkUpload) -> AppResult<()> {
        validate_name(&upload.original_name)?;
        if upload.total_chunks == 0 {
            return Err(AppError::validation("total_chunks must be at least 1"));
        }
        if upload.total_chunks > self.limits.max_total_chunks {
            return Err(AppError::too_large(format!(
                "An upload may have at most {} chunks",
                self.limits.max_total_chunks
            )));
        }
        if upload.chunk_index >= upload.total_chunks {
            return Err(AppError::validation(format!(
                "chunk_index {} is out of range for {} chunks",
                upload.chunk_index, upload.total_chunks
            )));
        }
        if upload.data.len() as u64 > self.limits.max_chunk_bytes {
            return Err(AppError::too_large(format!(
                "Chunk is {} bytes, the limit is {} bytes",
                upload.data.len(),
                self.limits.max_chunk_bytes
            )));
        }
        Ok(())
    }

    /// Work out and check the destination directory before staging anything.
    async fn destination(&self, upload: &ChunkUpload) -> AppResult<Destination> {
        let base = RelativePath::sanitize(&upload.target_dir);
        let base_abs = self.resolver.resolve(&base).await?;
        if !fs::metadata(&base_abs)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &base.to_string()))?
            .is_dir()
        {
            return Err(AppError::parent_missing(format!("'{base}' is not a folder")));
        }

        let Some(raw) = upload.relative_path.as_deref() else {
            return Ok(Destination {
                dir: base,
                folder_upload: false,
            });
        };

        // Browsers report the file's own name as the last segment.
        let mut sub = RelativePath::sanitize(raw);
        if sub.name() == Some(upload.original_name.as_str()) {
            sub = sub.parent().unwrap_or_default();
        }
        Ok(Destination {
            dir: base.join_path(&sub),
            folder_upload: true,
        })
    }

    async fn assemble(
        &self,
        key: &str,
        name: &str,
        total: u32,
        destination: &Destination,
    ) -> AppResult<FileSystemEntry> {
        if !destination.folder_upload {
            let dir_abs = self.resolver.resolve(&destination.dir).await?;
            let _claim = self.locks.write(&path_key(&dir_abs.join(name))).await;
            if occupied(&dir_abs.join(name)).await? {
                return Err(AppError::already_exists(format!(
                    "'{}' already exists",
                    destination.dir.join(name)
                )));
            }
            return self.publish(key, total, &dir_abs, &destination.dir, name).await;
        }

        let dir_abs = self.resolver.ensure_dir(&destination.dir).await?;
        for _ in 0..PUBLISH_RETRIES {
            let (final_name, _claim) = claim_free_name(
                &self.locks,
                &dir_abs,
                name,
                FOLDER_UPLOAD_ATTEMPTS,
                numbered,
            )
            .await?;
            match self
                .publish(key, total, &dir_abs, &destination.dir, &final_name)
                .await
            {
                // Taken by something outside the lock table; the chunks are
                // still staged, so try the next free name.
                Err(e) if e.kind == ErrorKind::AlreadyExists => {
                    debug!(name = %final_name, "Upload name taken while publishing");
                }
                result => return result,
            }
        }
        Err(AppError::cannot_disambiguate(format!(
            "No free name for '{}' after {PUBLISH_RETRIES} attempts",
            destination.dir.join(name)
        )))
    }

    /// Concatenate the staged chunks and publish them as `dir/final_name`.
    async fn publish(
        &self,
        key: &str,
        total: u32,
        dir_abs: &Path,
        dir: &RelativePath,
        final_name: &str,
    ) -> AppResult<FileSystemEntry> {
        let rel = dir.join(final_name);
        let target = dir_abs.join(final_name);
        let temp = temp_path(dir_abs);

        let bytes = match self.concatenate(key, total, &temp, &rel).await {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(&temp).await;
                return Err(e);
            }
        };
        publish_new(&temp, &target, &rel.to_string()).await?;

        info!(path = %rel, chunks = total, bytes, "Assembled upload");
        describe(&rel, &target).await
    }

    /// Append every staged chunk to `temp` in index order.
    async fn concatenate(
        &self,
        key: &str,
        total: u32,
        temp: &Path,
        rel: &RelativePath,
    ) -> AppResult<u64> {
        let display = rel.to_string();
        let mut out = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(temp)
            .await
            .map_err(|e| AppError::from_io(e, "create", &display))?;

        let mut buffer = vec![0u8; COPY_BUFFER_BYTES];
        let mut written = 0u64;
        for index in 0..total {
            let chunk: PathBuf = self.staging.chunk_path(key, index);
            let mut input = fs::File::open(&chunk).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::ChunkMissing,
                    format!("Chunk {index} of '{display}' is missing"),
                    e,
                )
            })?;
            loop {
                let n = input.read(&mut buffer).await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::ChunkMissing,
                        format!("Chunk {index} of '{display}' is unreadable"),
                        e,
                    )
                })?;
                if n == 0 {
                    break;
                }
                out.write_all(&buffer[..n])
                    .await
                    .map_err(|e| AppError::from_io(e, "write", &display))?;
                written += n as u64;
            }
        }

        out.flush()
            .await
            .map_err(|e| AppError::from_io(e, "write", &display))?;
        out.sync_all()
            .await
            .map_err(|e| AppError::from_io(e, "write", &display))?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::RootContext;

    async fn assembler() -> (tempfile::TempDir, ChunkAssembler) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RootContext::open(dir.path().join("root"), ".webfm").await.unwrap();
        let limits = UploadLimits {
            max_chunk_bytes: 1024,
            max_total_chunks: 100,
        };
        (dir, ChunkAssembler::new(PathResolver::new(ctx), LockTable::new(), limits))
    }

    fn chunk(name: &str, index: u32, total: u32, data: &'static [u8]) -> ChunkUpload {
        ChunkUpload {
            original_name: name.to_string(),
            chunk_index: index,
            total_chunks: total,
            target_dir: String::new(),
            relative_path: None,
            data: Bytes::from_static(data),
        }
    }

    fn root(assembler: &ChunkAssembler) -> PathBuf {
        assembler.resolver.root().to_path_buf()
    }

    #[tokio::test]
    async fn test_out_of_order_arrival_assembles_in_index_order() {
        let (_dir, assembler) = assembler().await;
        let parts: [&'static [u8]; 4] = [b"zero-", b"one-", b"two-", b"three"];

        for index in [3u32, 1, 0] {
            let progress = assembler
                .accept_chunk(chunk("f.bin", index, 4, parts[index as usize]))
                .await
                .unwrap();
            assert!(!progress.is_finished());
        }
        let progress = assembler.accept_chunk(chunk("f.bin", 2, 4, parts[2])).await.unwrap();
        let UploadProgress::Finished { entry } = progress else {
            panic!("expected a finished upload");
        };
        assert_eq!(entry.path, "f.bin");
        assert_eq!(std::fs::read(root(&assembler).join("f.bin")).unwrap(), b"zero-one-two-three");
    }

    #[tokio::test]
    async fn test_duplicate_chunk_does_not_break_count() {
        let (_dir, assembler) = assembler().await;
        assembler.accept_chunk(chunk("d.bin", 2, 3, b"C")).await.unwrap();
        let progress = assembler.accept_chunk(chunk("d.bin", 2, 3, b"C")).await.unwrap();
        match progress {
            UploadProgress::Pending { received, total } => {
                assert_eq!(received, 1);
                assert_eq!(total, 3);
            }
            UploadProgress::Finished { .. } => panic!("finished too early"),
        }
        assembler.accept_chunk(chunk("d.bin", 0, 3, b"A")).await.unwrap();
        let progress = assembler.accept_chunk(chunk("d.bin", 1, 3, b"B")).await.unwrap();
        assert!(progress.is_finished());
        assert_eq!(std::fs::read(root(&assembler).join("d.bin")).unwrap(), b"ABC");
    }

    #[tokio::test]
    async fn test_concurrent_final_chunks_assemble_once() {
        let (_dir, assembler) = assembler().await;
        assembler.accept_chunk(chunk("p.bin", 0, 2, b"first")).await.unwrap();

        let (a, b) = tokio::join!(
            assembler.accept_chunk(chunk("p.bin", 1, 2, b"second")),
            assembler.accept_chunk(chunk("p.bin", 1, 2, b"second")),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.is_finished());
        assert!(b.is_finished());

        let root = root(&assembler);
        assert_eq!(std::fs::read(root.join("p.bin")).unwrap(), b"firstsecond");
        let files = std::fs::read_dir(&root)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != ".webfm")
            .count();
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn test_single_file_refuses_existing_destination() {
        let (_dir, assembler) = assembler().await;
        std::fs::write(root(&assembler).join("taken.bin"), b"keep").unwrap();

        let err = assembler
            .accept_chunk(chunk("taken.bin", 0, 1, b"new"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(root(&assembler).join("taken.bin")).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn test_folder_upload_creates_dirs_and_renames() {
        let (_dir, assembler) = assembler().await;
        let root = root(&assembler);
        std::fs::create_dir_all(root.join("album/2020")).unwrap();
        std::fs::write(root.join("album/2020/pic.jpg"), b"old").unwrap();

        let mut upload = chunk("pic.jpg", 0, 1, b"new");
        upload.relative_path = Some("album/2020/pic.jpg".to_string());
        let UploadProgress::Finished { entry } = assembler.accept_chunk(upload).await.unwrap()
        else {
            panic!("expected a finished upload");
        };
        assert_eq!(entry.path, "album/2020/pic_1.jpg");
        assert_eq!(std::fs::read(root.join("album/2020/pic.jpg")).unwrap(), b"old");

        let mut upload = chunk("deep.txt", 0, 1, b"d");
        upload.relative_path = Some("new/nested".to_string());
        let progress = assembler.accept_chunk(upload).await.unwrap();
        assert!(progress.is_finished());
        assert!(root.join("new/nested/deep.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_again_after_delete_writes_new_content() {
        let (_dir, assembler) = assembler().await;
        let root = root(&assembler);

        assert!(assembler.accept_chunk(chunk("a.txt", 0, 1, b"v1")).await.unwrap().is_finished());
        std::fs::remove_file(root.join("a.txt")).unwrap();

        let progress = assembler.accept_chunk(chunk("a.txt", 0, 1, b"v2")).await.unwrap();
        assert!(progress.is_finished());
        assert_eq!(std::fs::read(root.join("a.txt")).unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_upload_again_over_finished_file_is_refused() {
        let (_dir, assembler) = assembler().await;
        assembler.accept_chunk(chunk("a.txt", 0, 1, b"v1")).await.unwrap();

        let err = assembler
            .accept_chunk(chunk("a.txt", 0, 1, b"v2"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(root(&assembler).join("a.txt")).unwrap(), b"v1");
    }

    #[tokio::test]
    async fn test_second_folder_upload_lands_beside_first() {
        let (_dir, assembler) = assembler().await;
        let root = root(&assembler);

        let uploads: [(&'static [u8], &str); 2] =
            [(b"first", "album/pic.jpg"), (b"second", "album/pic_1.jpg")];
        for (data, expected) in uploads {
            let mut upload = chunk("pic.jpg", 0, 1, data);
            upload.relative_path = Some("album/pic.jpg".to_string());
            let UploadProgress::Finished { entry } = assembler.accept_chunk(upload).await.unwrap()
            else {
                panic!("expected a finished upload");
            };
            assert_eq!(entry.path, expected);
        }
        assert_eq!(std::fs::read(root.join("album/pic.jpg")).unwrap(), b"first");
        assert_eq!(std::fs::read(root.join("album/pic_1.jpg")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_name_lost_at_publish_keeps_staged_chunks() {
        let (_dir, assembler) = assembler().await;
        let root = root(&assembler);
        assembler.accept_chunk(chunk("h.bin", 0, 2, b"h")).await.unwrap();
        std::fs::write(root.join("h.bin"), b"someone else").unwrap();

        let key = ChunkStaging::upload_key(&root, "", "h.bin");
        let dir = RelativePath::root();
        let err = assembler
            .publish(&key, 1, &root, &dir, "h.bin")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(root.join("h.bin")).unwrap(), b"someone else");

        let staged = assembler.staging.received_indices(&key).await.unwrap();
        assert!(staged.contains(&0));
        let entry = assembler
            .publish(&key, 1, &root, &dir, "h_1.bin")
            .await
            .unwrap();
        assert_eq!(entry.path, "h_1.bin");
        assert_eq!(std::fs::read(root.join("h_1.bin")).unwrap(), b"h");
    }

    #[tokio::test]
    async fn test_missing_chunk_leaves_no_artifact() {
        let (_dir, assembler) = assembler().await;
        assembler.accept_chunk(chunk("g.bin", 0, 2, b"a")).await.unwrap();

        let key = ChunkStaging::upload_key(&root(&assembler), "", "g.bin");
        let destination = Destination {
            dir: RelativePath::root(),
            folder_upload: false,
        };
        let err = assembler
            .assemble(&key, "g.bin", 2, &destination)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ChunkMissing);
        assert!(err.message.contains("Chunk 1"));

        let leftovers = std::fs::read_dir(root(&assembler))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != ".webfm")
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_limits() {
        let (_dir, assembler) = assembler().await;
        let err = assembler.accept_chunk(chunk("x.bin", 2, 2, b"a")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = assembler.accept_chunk(chunk("x.bin", 0, 101, b"a")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooLarge);

        let err = assembler.accept_chunk(chunk("../x.bin", 0, 1, b"a")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidName);
    }
}
