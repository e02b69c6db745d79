//! Route handlers organized by domain.

pub mod browse;
pub mod file;
pub mod folder;
pub mod health;
pub mod trash;
pub mod upload;
