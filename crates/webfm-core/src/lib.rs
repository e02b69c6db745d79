//! # webfm-core
//!
//! Core crate for webfm. Contains configuration schemas, the filesystem
//! entry and bulk-report types shared by every layer, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other webfm crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
