//! Filesystem entry descriptors returned by every core operation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an entry is a regular file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file (symlinks to files included).
    File,
    /// A directory.
    Folder,
}

impl EntryKind {
    /// Classify OS metadata.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        if meta.is_dir() {
            Self::Folder
        } else {
            Self::File
        }
    }

    /// Whether this is a folder.
    pub fn is_folder(self) -> bool {
        matches!(self, Self::Folder)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// A named node under the root.
///
/// The filesystem is the source of truth; this is a snapshot taken when the
/// operation returned and is never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    /// Final path segment.
    pub name: String,
    /// Root-relative, forward-slash separated path.
    pub path: String,
    /// File or folder.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size in bytes (0 for folders).
    pub size_bytes: u64,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
}

impl FileSystemEntry {
    /// Build an entry from OS metadata.
    pub fn from_metadata(
        name: impl Into<String>,
        path: impl Into<String>,
        meta: &std::fs::Metadata,
    ) -> Self {
        let kind = EntryKind::from_metadata(meta);
        let modified_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Self {
            name: name.into(),
            path: path.into(),
            kind,
            size_bytes: if kind.is_folder() { 0 } else { meta.len() },
            modified_at,
        }
    }
}
