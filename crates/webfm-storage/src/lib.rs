//! # webfm-storage
//!
//! The filesystem operation core of webfm. Every client path enters through
//! [`PathResolver`], which hands verified absolute paths to [`FileStore`],
//! [`ChunkAssembler`], [`TrashStore`] and [`DirectoryLister`].

pub mod chunked;
pub mod codec;
pub mod fs;
pub mod lister;
pub mod lock;
pub mod path;
pub mod trash;

pub use chunked::{ChunkAssembler, ChunkStaging, ChunkUpload, UploadLimits, UploadProgress};
pub use fs::{FileStore, TextFile, TextPolicy};
pub use lister::{Breadcrumb, DirectoryLister, Listing};
pub use lock::LockTable;
pub use path::{PathResolver, RelativePath, RootContext};
pub use trash::{TrashEntry, TrashStore, TrashSummary};
