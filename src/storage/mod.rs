//! Storage interfaces and implementations for persisting alerts.

mod sqlite;

pub use sqlite::{SqliteStorage, SqliteStorageConfig};

use crate::domain::ArbitrageAlert;
use async_trait::async_trait;

/// AlertStorage defines the interface for storing arbitrage alerts.
#[async_trait]
pub trait AlertStorage: Send + Sync {
    /// Save persists an alert to storage.
    /// Returns true if the alert was saved (new), false if an equivalent alert
    /// was already stored in the same time window.
    async fn save(&self, alert: &ArbitrageAlert) -> Result<bool, StorageError>;

    /// Recent returns up to `limit` alerts, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ArbitrageAlert>, StorageError>;

    /// Count returns the total number of stored alerts.
    async fn count(&self) -> Result<i64, StorageError>;

    /// Close closes the storage connection.
    async fn close(&self) -> Result<(), StorageError>;
}

/// StorageError represents errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
