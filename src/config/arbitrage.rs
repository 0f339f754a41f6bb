//! Divergence detection configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

use super::duration;

pub const DEFAULT_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 3);
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_CONCURRENT_PAIRS: usize = 8;
pub const DEFAULT_ALERT_HISTORY: usize = 10;
pub const DEFAULT_ALERT_QUEUE_SIZE: usize = 100;

/// Detection and scheduling settings.
///
/// Every field is optional; the accessors fall back to the defaults above.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArbitrageConfig {
    /// Relative difference that triggers an alert (e.g., 0.001 for 0.1%).
    ///
    /// Accepts a YAML number or a string and keeps it as text so that
    /// parsing to `Decimal` and its error reporting stay in one place.
    #[serde(default, deserialize_with = "number_or_string")]
    pub threshold: Option<String>,
    /// Time between scan cycles (default: 30s).
    #[serde(default, with = "duration")]
    pub scan_interval: Option<Duration>,
    /// Per-request HTTP timeout (default: 8s).
    #[serde(default, with = "duration")]
    pub request_timeout: Option<Duration>,
    /// How many pairs are fetched at once within a cycle.
    pub max_concurrent_pairs: Option<usize>,
    /// Capacity of the recent alert ring buffer.
    pub alert_history: Option<usize>,
    /// Capacity of the outgoing alert queue.
    pub alert_queue_size: Option<usize>,
}

impl ArbitrageConfig {
    pub fn scan_interval(&self) -> Duration {
        self.scan_interval.unwrap_or(DEFAULT_SCAN_INTERVAL)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn max_concurrent_pairs(&self) -> usize {
        self.max_concurrent_pairs
            .unwrap_or(DEFAULT_MAX_CONCURRENT_PAIRS)
    }

    pub fn alert_history(&self) -> usize {
        self.alert_history.unwrap_or(DEFAULT_ALERT_HISTORY)
    }

    pub fn alert_queue_size(&self) -> usize {
        self.alert_queue_size.unwrap_or(DEFAULT_ALERT_QUEUE_SIZE)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrString> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        NumberOrString::Text(s) => s,
        NumberOrString::Integer(n) => n.to_string(),
        NumberOrString::Float(x) => x.to_string(),
    }))
}
