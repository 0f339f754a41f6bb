//! Application-level configuration.

use serde::Deserialize;

/// Application-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Name shown in logs and the startup notice.
    pub name: String,
    /// "development" relaxes the Telegram credential check.
    #[serde(default = "default_env")]
    pub env: String,
    /// Fallback log filter when RUST_LOG is unset.
    pub log_level: Option<String>,
}

fn default_env() -> String {
    "development".to_string()
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.env.eq_ignore_ascii_case("development")
    }
}
