//! Arbitrage alert domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Pair, PriceQuote};

/// Relative price difference `|a - b| / min(a, b)`.
///
/// The smaller price is the denominator, so the metric is symmetric in its
/// arguments but larger than a mid-price normalization. Alert thresholds are
/// calibrated against exactly this formula.
/// Returns `None` when either price is not strictly positive.
pub fn relative_diff(a: Decimal, b: Decimal) -> Option<Decimal> {
    if a <= Decimal::ZERO || b <= Decimal::ZERO {
        return None;
    }
    (a - b).abs().checked_div(a.min(b))
}

/// ArbitrageAlert is a pair of quotes whose relative diff met the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageAlert {
    pub pair: Pair,
    pub exchange_a: String,
    pub price_a: Decimal,
    pub exchange_b: String,
    pub price_b: Decimal,
    /// `|price_a - price_b| / min(price_a, price_b)`.
    pub relative_diff: Decimal,
    /// When this alert was produced by the scanner.
    pub detected_at: DateTime<Utc>,
}

impl ArbitrageAlert {
    /// Builds an alert from two quotes of the same pair.
    pub fn from_quotes(a: &PriceQuote, b: &PriceQuote) -> Option<Self> {
        let diff = relative_diff(a.price, b.price)?;
        Some(Self {
            pair: a.pair.clone(),
            exchange_a: a.exchange.clone(),
            price_a: a.price,
            exchange_b: b.exchange.clone(),
            price_b: b.price,
            relative_diff: diff,
            detected_at: Utc::now(),
        })
    }

    /// Relative diff expressed in percent.
    pub fn diff_percent(&self) -> Decimal {
        self.relative_diff * Decimal::ONE_HUNDRED
    }
}
