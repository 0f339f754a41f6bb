//! Bot error types.

use crate::config::ConfigError;
use crate::exchanges::RegistryError;
use crate::notification::NotificationError;
use crate::storage::StorageError;

use super::StateError;

/// Bot error type.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("bot is already running")]
    AlreadyRunning,
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("exchange error: {0}")]
    Exchange(#[from] RegistryError),
    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("notification error: {0}")]
    Notification(#[from] NotificationError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
