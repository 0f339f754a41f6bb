//! Storage configuration.

use serde::Deserialize;

pub const DEFAULT_STORAGE_PATH: &str = "alerts.db";

/// Alert storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Whether alerts are persisted.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the SQLite database file.
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn path(&self) -> &str {
        self.path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_STORAGE_PATH)
    }
}
