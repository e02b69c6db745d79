//! Activity records for successful mutations.
//!
//! Every record is one `tracing` event on the `webfm::activity` target so a
//! subscriber can route it to its own sink.

use chrono::Utc;
use serde_json::Value;

use webfm_core::types::FileSystemEntry;
use webfm_storage::TrashEntry;

/// Target every activity event is emitted on.
pub const ACTIVITY_TARGET: &str = "webfm::activity";

/// One user-visible change.
#[derive(Debug, Clone)]
pub struct Activity {
    action: &'static str,
    target_name: String,
    target_type: String,
    path: String,
    extra: Option<Value>,
}

impl Activity {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            target_name: String::new(),
            target_type: String::new(),
            path: String::new(),
            extra: None,
        }
    }

    /// Describe the affected entry.
    pub fn entry(mut self, entry: &FileSystemEntry) -> Self {
        self.target_name = entry.name.clone();
        self.target_type = entry.kind.to_string();
        self.path = entry.path.clone();
        self
    }

    /// Describe a trashed entry by its original location.
    pub fn trashed(mut self, entry: &TrashEntry) -> Self {
        self.target_name = entry.original_name.clone();
        self.target_type = entry.kind.to_string();
        self.path = entry.original_relative_path.clone();
        self
    }

    pub fn extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn emit(self) {
        let extra = self.extra.map(|v| v.to_string()).unwrap_or_default();
        tracing::info!(
            target: ACTIVITY_TARGET,
            timestamp = %Utc::now().to_rfc3339(),
            action = self.action,
            target_name = %self.target_name,
            target_type = %self.target_type,
            path = %self.path,
            extra = %extra,
            "activity"
        );
    }
}
