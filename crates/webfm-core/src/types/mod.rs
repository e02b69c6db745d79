//! Core type definitions used across the webfm workspace.

pub mod bulk;
pub mod entry;

pub use bulk::{BulkReport, ItemFailure};
pub use entry::{EntryKind, FileSystemEntry};
