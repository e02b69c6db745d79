//! Built-in job handler implementations.

pub mod cleanup;

pub use cleanup::{STAGING_CLEANUP, StagingCleanupHandler, TRASH_RETENTION, TrashRetentionHandler};
