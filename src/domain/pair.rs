//! Trading pair identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a pair string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pair {0:?}: expected BASE/QUOTE")]
pub struct PairParseError(pub String);

/// Pair is an ordered base/quote symbol combination (e.g., BTC/USDT).
///
/// Symbols are stored uppercase. Exchange-specific encodings ("BTCUSDT",
/// "BTC-USDT", "btcusdt") are built by the adapters from these two parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    /// Creates a new pair, normalizing both symbols to uppercase.
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().to_uppercase(),
            quote: quote.as_ref().trim().to_uppercase(),
        }
    }

    /// Returns base and quote joined by `sep` ("BTC-USDT" for `sep = "-"`).
    pub fn joined(&self, sep: &str) -> String {
        format!("{}{}{}", self.base, sep, self.quote)
    }

    /// Returns base and quote concatenated ("BTCUSDT").
    pub fn concat(&self) -> String {
        self.joined("")
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| PairParseError(s.to_string()))?;

        let valid = |sym: &str| !sym.is_empty() && sym.chars().all(|c| c.is_ascii_alphanumeric());
        let (base, quote) = (base.trim(), quote.trim());
        if !valid(base) || !valid(quote) {
            return Err(PairParseError(s.to_string()));
        }

        Ok(Pair::new(base, quote))
    }
}
