//! Chunked upload handling.

pub mod assembler;
pub mod staging;

pub use assembler::{ChunkAssembler, ChunkUpload, UploadLimits, UploadProgress};
pub use staging::ChunkStaging;
