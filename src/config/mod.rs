//! Configuration loading and validation for the divergence monitor.
//!
//! Uses serde_yaml to load YAML configuration files with environment
//! variable overrides for credentials and deployment knobs.

mod app;
mod arbitrage;
mod duration;
mod error;
mod exchange;
mod notification;
mod server;
mod storage;

pub use app::AppConfig;
pub use arbitrage::{
    ArbitrageConfig, DEFAULT_ALERT_HISTORY, DEFAULT_ALERT_QUEUE_SIZE,
    DEFAULT_MAX_CONCURRENT_PAIRS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SCAN_INTERVAL,
    DEFAULT_THRESHOLD,
};
pub use error::ConfigError;
pub use exchange::ExchangeConfig;
pub use notification::{DEFAULT_OVERVIEW_INTERVAL, NotificationConfig, TelegramConfig};
pub use server::{DEFAULT_HOST, DEFAULT_PORT, ServerConfig};
pub use storage::{DEFAULT_STORAGE_PATH, StorageConfig};

use rust_decimal::Decimal;
use serde::Deserialize;
use std::{collections::HashMap, env, fs};

use crate::bot::parse_threshold;
use crate::domain::Pair;

/// Root configuration structure.
///
/// Required sections: app, exchanges, pairs.
/// Optional sections: arbitrage, notification, server, storage.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    /// Maps exchange identifiers to their configurations.
    pub exchanges: HashMap<String, ExchangeConfig>,
    /// Pairs to monitor (e.g., "BTC/USDT").
    pub pairs: Vec<String>,
    pub arbitrage: Option<ArbitrageConfig>,
    pub notification: Option<NotificationConfig>,
    pub server: Option<ServerConfig>,
    pub storage: Option<StorageConfig>,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Loads `.env` first (if present), then the YAML file, then applies
    /// overrides from the process environment:
    /// - `TELEGRAM_BOT_TOKEN` (or `BOT_TOKEN`), `TELEGRAM_CHAT_ID` (or `CHAT_ID`)
    /// - `PRICE_DIFF_THRESHOLD`, `PORT`
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        // Missing .env is fine
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)?;
        Self::from_yaml_with_env(&content, |name| env::var(name).ok())
    }

    /// Parses YAML, applies overrides from `lookup` and validates.
    pub fn from_yaml_with_env<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides. Empty values count as unset.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |primary: &str, alias: &str| {
            lookup(primary)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| lookup(alias).filter(|v| !v.trim().is_empty()))
        };

        if let Some(telegram) = self
            .notification
            .as_mut()
            .and_then(|n| n.telegram.as_mut())
        {
            if telegram.enabled {
                telegram.bot_token = var("TELEGRAM_BOT_TOKEN", "BOT_TOKEN").unwrap_or_default();
                telegram.chat_id = var("TELEGRAM_CHAT_ID", "CHAT_ID").unwrap_or_default();
            }
        }

        if let Some(threshold) = lookup("PRICE_DIFF_THRESHOLD").filter(|v| !v.trim().is_empty()) {
            self.arbitrage
                .get_or_insert_with(ArbitrageConfig::default)
                .threshold = Some(threshold.trim().to_string());
        }

        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
                name: "PORT",
                reason: format!("{:?} is not a valid port", port),
            })?;
            self.server.get_or_insert_with(ServerConfig::default).port = Some(port);
        }

        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.trim().is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        if self.pairs.is_empty() {
            return Err(ConfigError::Validation(
                "at least one trading pair is required".into(),
            ));
        }
        self.parsed_pairs()?;

        if !self.exchanges.values().any(|e| e.enabled) {
            return Err(ConfigError::Validation(
                "at least one exchange must be enabled".into(),
            ));
        }

        self.threshold()?;

        let arbitrage = self.arbitrage();
        if arbitrage.scan_interval().is_zero() {
            return Err(ConfigError::Validation(
                "arbitrage.scan_interval must be positive".into(),
            ));
        }
        if arbitrage.request_timeout().is_zero() {
            return Err(ConfigError::Validation(
                "arbitrage.request_timeout must be positive".into(),
            ));
        }
        if arbitrage.max_concurrent_pairs() == 0 {
            return Err(ConfigError::Validation(
                "arbitrage.max_concurrent_pairs must be at least 1".into(),
            ));
        }
        if arbitrage.alert_history() == 0 {
            return Err(ConfigError::Validation(
                "arbitrage.alert_history must be at least 1".into(),
            ));
        }
        if arbitrage.alert_queue_size() == 0 {
            return Err(ConfigError::Validation(
                "arbitrage.alert_queue_size must be at least 1".into(),
            ));
        }

        // Only require Telegram credentials outside development
        if let Some(telegram) = self.telegram() {
            if telegram.enabled
                && !self.app.is_development()
                && (telegram.bot_token.is_empty() || telegram.chat_id.is_empty())
            {
                return Err(ConfigError::Validation(
                    "telegram: credentials not found (set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID env vars)"
                        .into(),
                ));
            }
        }

        Ok(())
    }

    /// Parses the configured pairs in order.
    pub fn parsed_pairs(&self) -> Result<Vec<Pair>, ConfigError> {
        self.pairs
            .iter()
            .map(|p| {
                p.parse::<Pair>()
                    .map_err(|e| ConfigError::Validation(format!("pairs: {}", e)))
            })
            .collect()
    }

    /// Returns the initial alert threshold.
    pub fn threshold(&self) -> Result<Decimal, ConfigError> {
        match self.arbitrage.as_ref().and_then(|a| a.threshold.as_deref()) {
            Some(raw) => parse_threshold(raw)
                .map_err(|e| ConfigError::Validation(format!("arbitrage.threshold: {}", e))),
            None => Ok(DEFAULT_THRESHOLD),
        }
    }

    /// Returns the arbitrage section, or defaults when absent.
    pub fn arbitrage(&self) -> ArbitrageConfig {
        self.arbitrage.clone().unwrap_or_default()
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    pub fn telegram(&self) -> Option<&TelegramConfig> {
        self.notification.as_ref().and_then(|n| n.telegram.as_ref())
    }
}
