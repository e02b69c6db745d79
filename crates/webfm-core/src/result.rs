//! Convenience result type alias for webfm.

use crate::error::AppError;

/// A specialized `Result` type for webfm operations.
pub type AppResult<T> = Result<T, AppError>;
