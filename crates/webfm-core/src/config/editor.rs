//! Text editor configuration.

use serde::{Deserialize, Serialize};

/// Limits for the in-browser text editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Lower-case extensions (without dot) that may be read and written as text.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Maximum size of an editable file in bytes (default 2 MiB).
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_allowed_extensions() -> Vec<String> {
    [
        "txt", "md", "markdown", "json", "xml", "yaml", "yml", "toml", "ini", "cfg", "conf",
        "csv", "log", "html", "htm", "css", "js", "ts", "rs", "py", "sh", "sql", "env",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_bytes() -> u64 {
    2 * 1024 * 1024
}
