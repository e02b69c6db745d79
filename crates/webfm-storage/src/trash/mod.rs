//! Soft delete: quarantine blobs plus a ledger describing them.

pub mod ledger;
mod store;

pub use ledger::{Ledger, TrashEntry};
pub use store::{TrashStore, TrashSummary};
