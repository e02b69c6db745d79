//! Per-item outcome collection for bulk operations.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

/// One input of a bulk call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// The path or id the caller supplied.
    pub item: String,
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable reason.
    pub message: String,
}

impl ItemFailure {
    /// Record `err` against `item`.
    pub fn new(item: impl Into<String>, err: &AppError) -> Self {
        Self {
            item: item.into(),
            kind: err.kind,
            message: err.message.clone(),
        }
    }
}

/// Successes and failures of a bulk call.
///
/// Every attempted input ends up in exactly one of the two lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport<T> {
    /// Items that were applied.
    pub succeeded: Vec<T>,
    /// Items that failed, with their reason.
    pub failed: Vec<ItemFailure>,
}

impl<T> Default for BulkReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BulkReport<T> {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one item's result into the report.
    pub fn record(&mut self, item: impl Into<String>, result: Result<T, AppError>) {
        match result {
            Ok(value) => self.succeeded.push(value),
            Err(err) => self.failed.push(ItemFailure::new(item, &err)),
        }
    }

    /// Number of inputs accounted for.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Whether some, but not all, items failed.
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }

    /// Fail outright only when nothing succeeded out of at least one attempt.
    ///
    /// The returned error carries the first failure's kind; its message lists
    /// every failed item.
    pub fn into_result(self) -> Result<Self, AppError> {
        if self.succeeded.is_empty() && !self.failed.is_empty() {
            let kind = self.failed[0].kind;
            let message = if self.failed.len() == 1 {
                format!("{}: {}", self.failed[0].item, self.failed[0].message)
            } else {
                self.failed
                    .iter()
                    .map(|f| format!("{}: {}", f.item, f.message))
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            return Err(AppError::new(kind, message));
        }
        Ok(self)
    }
}
