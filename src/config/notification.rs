//! Notification configuration.

use serde::Deserialize;
use std::time::Duration;

use super::duration;

pub const DEFAULT_OVERVIEW_INTERVAL: Duration = Duration::from_secs(3600);

/// Notification settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    /// Telegram bot notifications and commands.
    pub telegram: Option<TelegramConfig>,
}

/// Telegram settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Bot token (TELEGRAM_BOT_TOKEN or BOT_TOKEN).
    #[serde(skip)]
    pub bot_token: String,
    /// Chat that receives alerts and may issue commands (TELEGRAM_CHAT_ID or CHAT_ID).
    #[serde(skip)]
    pub chat_id: String,
    #[serde(default = "default_true")]
    pub notify_alerts: bool,
    #[serde(default)]
    pub notify_errors: bool,
    /// Send periodic overview notifications with stats.
    #[serde(default)]
    pub notify_overview: bool,
    /// Interval between overview notifications (default: 1h).
    #[serde(default, with = "duration")]
    pub overview_interval: Option<Duration>,
    /// Poll for chat commands.
    #[serde(default = "default_true")]
    pub commands: bool,
}

fn default_true() -> bool {
    true
}

impl TelegramConfig {
    /// Returns true when the bot can actually talk to Telegram.
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    pub fn overview_interval(&self) -> Duration {
        self.overview_interval
            .filter(|d| !d.is_zero())
            .unwrap_or(DEFAULT_OVERVIEW_INTERVAL)
    }
}
