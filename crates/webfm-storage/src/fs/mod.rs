//! Filesystem primitives: the [`FileStore`] plus the publish, naming and
//! removal helpers shared with the upload and trash subsystems.

pub mod atomic;
pub mod naming;
pub mod remove;
mod store;

pub(crate) use store::describe;
pub use remove::remove_tree;
pub use store::{FileStore, TextFile, TextPolicy};
