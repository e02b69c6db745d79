//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every section has defaults so an empty file is a valid config.

pub mod app;
pub mod editor;
pub mod logging;
pub mod storage;
pub mod trash;
pub mod upload;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::editor::EditorConfig;
use self::logging::LoggingConfig;
use self::storage::StorageConfig;
use self::trash::TrashConfig;
use self::upload::UploadConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Root directory and system area settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Text editor limits.
    #[serde(default)]
    pub editor: EditorConfig,
    /// Chunked upload limits.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Trash retention settings.
    #[serde(default)]
    pub trash: TrashConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `WEBFM_`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WEBFM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the core cannot operate with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.storage.root_path.trim().is_empty() {
            return Err(AppError::configuration("storage.root_path must not be empty"));
        }
        if self.storage.system_dir.is_empty()
            || self.storage.system_dir.contains(['/', '\\'])
            || self.storage.system_dir == "."
            || self.storage.system_dir == ".."
        {
            return Err(AppError::configuration(
                "storage.system_dir must be a single directory name",
            ));
        }
        if self.editor.max_bytes == 0 {
            return Err(AppError::configuration("editor.max_bytes must be positive"));
        }
        if self.upload.max_chunk_bytes == 0 {
            return Err(AppError::configuration(
                "upload.max_chunk_bytes must be positive",
            ));
        }
        if self.trash.restore_attempts == 0 {
            return Err(AppError::configuration(
                "trash.restore_attempts must be positive",
            ));
        }
        Ok(())
    }
}
