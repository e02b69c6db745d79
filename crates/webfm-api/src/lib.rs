//! # webfm-api
//!
//! HTTP API layer for webfm built on Axum.
//!
//! Provides the REST endpoints over the filesystem core, request extractors,
//! DTOs, request logging, activity records and error mapping.

pub mod activity;
pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::AppState;
