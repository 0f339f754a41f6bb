//! Runtime statistics for the bot.

use std::time::Duration;

/// Runtime statistics for the bot.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub scan_cycles: u64,
    pub failed_cycles: u64,
    pub alerts_detected: u64,
    pub quotes_fetched: u64,
    pub last_cycle_duration: Duration,
}
