//! Mutable runtime settings shared by the scan loop and the command channel.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

/// Runtime state errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("invalid threshold {0:?}: expected a non-negative number")]
    InvalidThreshold(String),
}

/// RuntimeState holds the alert threshold and the pause flag.
///
/// Shared through an `Arc` between the bot loop (reader) and the command
/// handler (writer). The threshold sits behind a lock and the flag is atomic,
/// so readers never observe a partially written value.
#[derive(Debug)]
pub struct RuntimeState {
    threshold: RwLock<Decimal>,
    paused: AtomicBool,
}

impl RuntimeState {
    /// Creates a running (not paused) state with the given threshold.
    pub fn new(threshold: Decimal) -> Result<Self, StateError> {
        validate(threshold)?;
        Ok(Self {
            threshold: RwLock::new(threshold),
            paused: AtomicBool::new(false),
        })
    }

    pub fn threshold(&self) -> Decimal {
        *self.threshold.read()
    }

    /// Replaces the threshold. Negative values are rejected and leave the
    /// current threshold untouched.
    pub fn set_threshold(&self, value: Decimal) -> Result<Decimal, StateError> {
        validate(value)?;
        *self.threshold.write() = value;
        info!(threshold = %value, "Threshold updated");
        Ok(value)
    }

    /// Parses and applies a threshold received as text.
    pub fn set_threshold_str(&self, value: &str) -> Result<Decimal, StateError> {
        let parsed = parse_threshold(value)?;
        self.set_threshold(parsed)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            info!("Scanning paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            info!("Scanning resumed");
        }
    }
}

/// Parses a threshold from text. Accepts plain ("0.005") and scientific
/// ("5e-3") notation; rejects negatives and anything non-numeric.
pub fn parse_threshold(value: &str) -> Result<Decimal, StateError> {
    let trimmed = value.trim();
    let parsed = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| StateError::InvalidThreshold(value.to_string()))?;
    validate(parsed)?;
    Ok(parsed)
}

fn validate(value: Decimal) -> Result<(), StateError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(StateError::InvalidThreshold(value.to_string()));
    }
    Ok(())
}
