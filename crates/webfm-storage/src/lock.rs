//! Keyed async lock table.
//!
//! Hands out one `RwLock` per key (a canonical file path or an upload key).
//! Entries are dropped from the table once the last guard for a key goes
//! away, so the table only holds keys that are currently in use.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type Slot = Arc<RwLock<()>>;

/// A table of per-key reader/writer locks.
#[derive(Debug, Clone, Default)]
pub struct LockTable {
    slots: Arc<DashMap<String, Slot>>,
}

/// Guard returned by [`LockTable::read`] and [`LockTable::write`].
#[derive(Debug)]
pub struct KeyGuard {
    table: LockTable,
    key: String,
    guard: Option<GuardKind>,
}

#[derive(Debug)]
enum GuardKind {
    Read(#[allow(dead_code)] OwnedRwLockReadGuard<()>),
    Write(#[allow(dead_code)] OwnedRwLockWriteGuard<()>),
}

impl LockTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared lock on `key`.
    pub async fn read(&self, key: &str) -> KeyGuard {
        let slot = self.slot(key);
        let guard = slot.read_owned().await;
        KeyGuard {
            table: self.clone(),
            key: key.to_string(),
            guard: Some(GuardKind::Read(guard)),
        }
    }

    /// Acquire an exclusive lock on `key`.
    pub async fn write(&self, key: &str) -> KeyGuard {
        let slot = self.slot(key);
        let guard = slot.write_owned().await;
        KeyGuard {
            table: self.clone(),
            key: key.to_string(),
            guard: Some(GuardKind::Write(guard)),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no key is in use.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, key: &str) -> Slot {
        self.slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }
}

/// Lock key naming a filesystem entry.
///
/// Every operation that creates or replaces an entry holds the write lock
/// on this key across its "is the name free" check and the syscall that
/// takes the name.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Release the lock before checking whether anyone else still holds
        // a handle to the slot.
        self.guard.take();
        self.table
            .slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}
