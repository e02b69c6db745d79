//! Single-entry filesystem primitives confined to the root.

use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};

use webfm_core::config::editor::EditorConfig;
use webfm_core::error::{AppError, ErrorKind};
use webfm_core::result::AppResult;
use webfm_core::types::{BulkReport, FileSystemEntry};

use super::atomic::{publish_new, publish_replace, write_temp};
use super::naming::{extension, occupied};
use crate::codec::{self, TextEncoding};
use crate::lock::{LockTable, path_key};
use crate::path::{PathResolver, RelativePath, validate_name};

/// Which files the text editor may touch, and how large they may be.
#[derive(Debug, Clone)]
pub struct TextPolicy {
    allowed_extensions: Vec<String>,
    max_bytes: u64,
}

impl TextPolicy {
    /// Build a policy from an extension allow-list and a size limit.
    pub fn new(allowed_extensions: impl IntoIterator<Item = String>, max_bytes: u64) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_bytes,
        }
    }

    /// Maximum editable size in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn check_extension(&self, rel: &RelativePath) -> AppResult<()> {
        let allowed = rel
            .name()
            .and_then(extension)
            .is_some_and(|ext| self.allowed_extensions.contains(&ext));
        if !allowed {
            return Err(AppError::unsupported_type(format!(
                "'{rel}' is not an editable text file"
            )));
        }
        Ok(())
    }

    fn check_size(&self, rel: &RelativePath, size: u64) -> AppResult<()> {
        if size > self.max_bytes {
            return Err(AppError::too_large(format!(
                "'{rel}' is {size} bytes, the limit is {} bytes",
                self.max_bytes
            )));
        }
        Ok(())
    }
}

impl From<&EditorConfig> for TextPolicy {
    fn from(config: &EditorConfig) -> Self {
        Self::new(config.allowed_extensions.iter().cloned(), config.max_bytes)
    }
}

/// Decoded contents of an editable file.
#[derive(Debug, Clone, Serialize)]
pub struct TextFile {
    /// The file as it was when read.
    #[serde(flatten)]
    pub entry: FileSystemEntry,
    /// Content normalized to UTF-8.
    pub content: String,
    /// Encoding detected on disk.
    pub encoding: TextEncoding,
}

/// Create, read, write, rename and move single entries under the root.
///
/// Every path passes through [`PathResolver`] first. Text reads and writes
/// of the same file are serialized through a per-file lock, and anything
/// that takes a name holds that name's lock across the check and the
/// syscall. The lock table is shared with the upload and trash stores.
#[derive(Debug, Clone)]
pub struct FileStore {
    resolver: PathResolver,
    locks: LockTable,
}

impl FileStore {
    /// Create a store over `resolver`.
    pub fn new(resolver: PathResolver, locks: LockTable) -> Self {
        Self { resolver, locks }
    }

    /// The resolver used by this store.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Describe an existing entry.
    pub async fn stat(&self, rel: &RelativePath) -> AppResult<FileSystemEntry> {
        let abs = self.resolver.resolve(rel).await?;
        describe(rel, &abs).await
    }

    /// Create a single directory. The parent must already exist.
    pub async fn create_folder(&self, rel: &RelativePath) -> AppResult<FileSystemEntry> {
        let abs = self.resolver.resolve_new(rel).await?;
        let _claim = self.locks.write(&path_key(&abs)).await;
        fs::create_dir(&abs).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                AppError::already_exists(format!("'{rel}' already exists"))
            }
            _ => AppError::from_io(e, "create folder", &rel.to_string()),
        })?;

        info!(path = %rel, "Created folder");
        describe(rel, &abs).await
    }

    /// Create a file with `content`. The parent must exist and the name be free.
    pub async fn create_file(
        &self,
        rel: &RelativePath,
        content: &[u8],
    ) -> AppResult<FileSystemEntry> {
        let abs = self.resolver.resolve_new(rel).await?;
        let _claim = self.locks.write(&path_key(&abs)).await;
        if occupied(&abs).await? {
            return Err(AppError::already_exists(format!("'{rel}' already exists")));
        }

        let dir = parent_of(&abs)?;
        let temp = write_temp(dir, content).await?;
        publish_new(&temp, &abs, &rel.to_string()).await?;

        info!(path = %rel, bytes = content.len(), "Created file");
        describe(rel, &abs).await
    }

    /// Read an editable text file, normalizing its encoding to UTF-8.
    pub async fn read_text(&self, rel: &RelativePath, policy: &TextPolicy) -> AppResult<TextFile> {
        policy.check_extension(rel)?;
        let abs = self.resolver.resolve(rel).await?;
        let _guard = self.locks.read(&path_key(&abs)).await;

        let meta = fs::metadata(&abs)
            .await
            .map_err(|e| AppError::from_io(e, "read", &rel.to_string()))?;
        if meta.is_dir() {
            return Err(AppError::unsupported_type(format!("'{rel}' is a folder")));
        }
        policy.check_size(rel, meta.len())?;

        let bytes = fs::read(&abs)
            .await
            .map_err(|e| AppError::from_io(e, "read", &rel.to_string()))?;
        policy.check_size(rel, bytes.len() as u64)?;

        let (content, encoding) = codec::decode(&bytes);
        debug!(path = %rel, bytes = bytes.len(), ?encoding, "Read text file");

        Ok(TextFile {
            entry: FileSystemEntry::from_metadata(entry_name(rel), rel.to_string(), &meta),
            content,
            encoding,
        })
    }

    /// Replace the content of an existing editable text file.
    ///
    /// The new content is written beside the file and renamed over it while
    /// holding the file's exclusive lock, so readers see either the old or
    /// the new content in full.
    pub async fn write_text(
        &self,
        rel: &RelativePath,
        content: &str,
        policy: &TextPolicy,
    ) -> AppResult<FileSystemEntry> {
        policy.check_extension(rel)?;
        policy.check_size(rel, content.len() as u64)?;
        let abs = self.resolver.resolve(rel).await?;
        let _guard = self.locks.write(&path_key(&abs)).await;

        let meta = fs::metadata(&abs)
            .await
            .map_err(|e| AppError::from_io(e, "write", &rel.to_string()))?;
        if meta.is_dir() {
            return Err(AppError::unsupported_type(format!("'{rel}' is a folder")));
        }

        let temp = write_temp(parent_of(&abs)?, content.as_bytes()).await?;
        if let Err(e) = fs::set_permissions(&temp, meta.permissions()).await {
            debug!(path = %rel, error = %e, "Could not carry permissions over to new content");
        }
        publish_replace(&temp, &abs, &rel.to_string()).await?;

        info!(path = %rel, bytes = content.len(), "Wrote text file");
        describe(rel, &abs).await
    }

    /// Rename an entry within its directory.
    pub async fn rename(&self, rel: &RelativePath, new_name: &str) -> AppResult<FileSystemEntry> {
        let new_name = validate_name(new_name)?;
        let source = self.resolver.resolve_entry(rel).await?;
        let parent = rel.parent().unwrap_or_default();
        let target_rel = parent.join(new_name);
        let target = self.resolver.resolve_new(&target_rel).await?;

        let _claim = self.locks.write(&path_key(&target)).await;
        if occupied(&target).await? {
            return Err(AppError::name_in_use(format!("'{target_rel}' already exists")));
        }
        fs::rename(&source, &target)
            .await
            .map_err(|e| AppError::from_io(e, "rename", &rel.to_string()))?;

        info!(from = %rel, to = %target_rel, "Renamed entry");
        describe(&target_rel, &target).await
    }

    /// Move an entry to `target`, which names the entry's new full path.
    pub async fn move_path(
        &self,
        source_rel: &RelativePath,
        target_rel: &RelativePath,
    ) -> AppResult<FileSystemEntry> {
        if source_rel == target_rel {
            return Err(AppError::self_move(format!(
                "'{source_rel}' cannot be moved onto itself"
            )));
        }
        if target_rel.is_strictly_inside(source_rel) {
            return Err(AppError::recursive_move(format!(
                "'{source_rel}' cannot be moved into its own subfolder"
            )));
        }

        let source = self.resolver.resolve_entry(source_rel).await?;
        let target = self.resolver.resolve_new(target_rel).await?;

        // Lexical checks miss aliases created by symlinked parents.
        if source == target {
            return Err(AppError::self_move(format!(
                "'{source_rel}' cannot be moved onto itself"
            )));
        }
        let source_meta = fs::symlink_metadata(&source)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &source_rel.to_string()))?;
        if source_meta.is_dir() && target.starts_with(&source) {
            return Err(AppError::recursive_move(format!(
                "'{source_rel}' cannot be moved into its own subfolder"
            )));
        }

        let target_dir = parent_of(&target)?;
        let dir_meta = fs::metadata(target_dir)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &target_rel.to_string()))?;
        if dir_meta.permissions().readonly() {
            return Err(AppError::new(
                ErrorKind::NotWritable,
                format!("Destination folder of '{target_rel}' is not writable"),
            ));
        }

        let _claim = self.locks.write(&path_key(&target)).await;
        if occupied(&target).await? {
            return Err(AppError::name_in_use(format!("'{target_rel}' already exists")));
        }
        fs::rename(&source, &target)
            .await
            .map_err(|e| AppError::from_io(e, "move", &source_rel.to_string()))?;

        info!(from = %source_rel, to = %target_rel, "Moved entry");
        describe(target_rel, &target).await
    }

    /// Move every source into `destination`, keeping each entry's name.
    ///
    /// An unusable destination fails the whole call; otherwise each source is
    /// attempted independently and the call fails only if none succeeded.
    pub async fn move_many(
        &self,
        sources: &[RelativePath],
        destination: &RelativePath,
    ) -> AppResult<BulkReport<FileSystemEntry>> {
        let dest_abs = self.resolver.resolve(destination).await?;
        let dest_meta = fs::metadata(&dest_abs)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &destination.to_string()))?;
        if !dest_meta.is_dir() {
            return Err(AppError::parent_missing(format!(
                "Destination '{destination}' is not a folder"
            )));
        }

        let mut report = BulkReport::new();
        for source in sources {
            let result = match source.name() {
                Some(name) => self.move_path(source, &destination.join(name)).await,
                None => Err(AppError::invalid_name("The root directory cannot be moved")),
            };
            report.record(source.to_string(), result);
        }
        report.into_result()
    }

    /// Open a file for streaming.
    pub async fn open_read(&self, rel: &RelativePath) -> AppResult<(fs::File, FileSystemEntry)> {
        let abs = self.resolver.resolve(rel).await?;
        let entry = describe(rel, &abs).await?;
        if entry.kind.is_folder() {
            return Err(AppError::validation(format!("'{rel}' is a folder")));
        }
        let file = fs::File::open(&abs)
            .await
            .map_err(|e| AppError::from_io(e, "open", &rel.to_string()))?;
        Ok((file, entry))
    }
}

/// Snapshot an entry, describing a dangling symlink by the link itself.
pub(crate) async fn describe(rel: &RelativePath, abs: &Path) -> AppResult<FileSystemEntry> {
    let meta = match fs::metadata(abs).await {
        Ok(meta) => meta,
        Err(_) => fs::symlink_metadata(abs)
            .await
            .map_err(|e| AppError::from_io(e, "stat", &rel.to_string()))?,
    };
    Ok(FileSystemEntry::from_metadata(
        entry_name(rel),
        rel.to_string(),
        &meta,
    ))
}

fn entry_name(rel: &RelativePath) -> String {
    rel.name().unwrap_or_default().to_string()
}

fn parent_of(abs: &Path) -> AppResult<&Path> {
    abs.parent()
        .ok_or_else(|| AppError::internal(format!("'{}' has no parent", abs.display())))
}
