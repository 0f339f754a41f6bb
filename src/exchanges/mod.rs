//! Exchange adapters, the adapter registry and the concurrent price fetcher.

mod adapters;
mod fetcher;
mod registry;
mod utils;

pub use adapters::{BUILTIN_EXCHANGES, builtin};
pub use fetcher::PriceFetcher;
pub use registry::Registry;

use std::fmt;

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::domain::Pair;

/// Transport-level failure while fetching a quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The per-request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The exchange answered with a non-2xx status other than 403.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The body could not be read or is not valid JSON.
    #[error("malformed body: {0}")]
    Body(String),

    /// Any other request error reported by the HTTP client.
    #[error("request failed: {0}")]
    Request(String),
}

/// Errors produced while fetching one exchange quote.
///
/// All variants lead to the same result for the scanner: the exchange is
/// left out of the snapshot. They are kept apart for logging and counting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The exchange answered 403, usually a rate limit or geo block.
    #[error("rate limited (HTTP 403)")]
    RateLimited,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response does not contain a positive price at the expected path.
    #[error("parse failure: {0}")]
    ParseFailure(String),
}

impl FetchError {
    /// Short label used in logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimited => "rate_limited",
            FetchError::Transport(_) => "transport_error",
            FetchError::ParseFailure(_) => "parse_failure",
        }
    }
}

/// Adapter registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("exchange {0} is already registered")]
    DuplicateExchange(String),

    #[error("unknown exchange: {0}")]
    UnknownExchange(String),
}

/// Builds the exchange-specific request path (including query) for a pair.
pub type PathBuilder = fn(&Pair) -> String;

/// Selects the price field inside a decoded response body.
pub type PriceField = fn(&Value) -> Option<&Value>;

/// ExchangeAdapter turns a pair into a ticker URL and a ticker response into
/// a price. It performs no I/O.
#[derive(Clone)]
pub struct ExchangeAdapter {
    name: String,
    base_url: String,
    path: PathBuilder,
    price_field: PriceField,
}

impl ExchangeAdapter {
    /// Creates a new adapter. A trailing slash on `base_url` is dropped.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        path: PathBuilder,
        price_field: PriceField,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: normalize_base_url(base_url.into()),
            path,
            price_field,
        }
    }

    /// Returns a copy of this adapter pointed at another host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url.into());
        self
    }

    /// Exchange name used in quotes, alerts and logs (e.g., "Binance").
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the GET URL for the pair's ticker.
    pub fn build_url(&self, pair: &Pair) -> String {
        format!("{}{}", self.base_url, (self.path)(pair))
    }

    /// Extracts the last traded price from a decoded response body.
    pub fn parse(&self, body: &Value) -> Result<Decimal, FetchError> {
        let field = (self.price_field)(body).ok_or_else(|| {
            FetchError::ParseFailure(format!("{}: price field missing", self.name))
        })?;

        let price = utils::decimal_from_value(field).ok_or_else(|| {
            FetchError::ParseFailure(format!("{}: price is not numeric: {}", self.name, field))
        })?;

        if price <= Decimal::ZERO {
            return Err(FetchError::ParseFailure(format!(
                "{}: price must be positive, got {}",
                self.name, price
            )));
        }

        Ok(price)
    }
}

impl fmt::Debug for ExchangeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeAdapter")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
