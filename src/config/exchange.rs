//! Exchange configuration.

use serde::Deserialize;

/// Settings for a single exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Whether quotes are fetched from this exchange.
    #[serde(default)]
    pub enabled: bool,
    /// Overrides the public API root (tests, proxies, mirrors).
    pub base_url: Option<String>,
}
