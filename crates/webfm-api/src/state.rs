//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use webfm_core::config::AppConfig;
use webfm_storage::{
    ChunkAssembler, DirectoryLister, FileStore, LockTable, PathResolver, RootContext, TextPolicy,
    TrashStore, UploadLimits,
};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. Every field is
/// cheap to clone. The stores share one lock table, so no two of them can
/// take the same name at once.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Extension allow list and size cap for the text editor
    pub text_policy: Arc<TextPolicy>,

    // ── Filesystem core ──────────────────────────────────────
    /// Single-entry operations
    pub files: Arc<FileStore>,
    /// Directory listings
    pub lister: Arc<DirectoryLister>,
    /// Chunked uploads
    pub uploads: Arc<ChunkAssembler>,
    /// Soft delete and restore
    pub trash: Arc<TrashStore>,
}

impl AppState {
    /// Wire every store over one root.
    pub fn new(config: AppConfig, root: RootContext) -> Self {
        let resolver = PathResolver::new(root);
        let locks = LockTable::new();
        let text_policy = TextPolicy::from(&config.editor);
        let uploads = ChunkAssembler::new(
            resolver.clone(),
            locks.clone(),
            UploadLimits::from(&config.upload),
        );
        let trash = TrashStore::new(resolver.clone(), locks.clone(), config.trash.restore_attempts);

        Self {
            text_policy: Arc::new(text_policy),
            files: Arc::new(FileStore::new(resolver.clone(), locks)),
            lister: Arc::new(DirectoryLister::new(resolver)),
            uploads: Arc::new(uploads),
            trash: Arc::new(trash),
            config: Arc::new(config),
        }
    }
}
