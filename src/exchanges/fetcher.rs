//! Concurrent, failure-isolated ticker fetching.

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::Mutex;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::{ExchangeAdapter, FetchError, Registry, TransportError};
use crate::bot::RuntimeState;
use crate::domain::{Pair, PriceQuote, PriceSnapshot};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Some exchanges reject requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0";

/// Outcome counters for one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExchangeFetchStats {
    pub success: u64,
    pub rate_limited: u64,
    pub transport_error: u64,
    pub parse_failure: u64,
}

impl ExchangeFetchStats {
    pub fn failures(&self) -> u64 {
        self.rate_limited + self.transport_error + self.parse_failure
    }
}

/// FetchStats counts fetch outcomes per exchange for operability.
#[derive(Debug, Default)]
pub struct FetchStats {
    per_exchange: Mutex<BTreeMap<String, ExchangeFetchStats>>,
}

impl FetchStats {
    /// Records the outcome of one fetch.
    pub fn record(&self, exchange: &str, outcome: Result<(), &FetchError>) {
        let mut map = self.per_exchange.lock();
        let entry = map.entry(exchange.to_string()).or_default();
        match outcome {
            Ok(()) => entry.success += 1,
            Err(FetchError::RateLimited) => entry.rate_limited += 1,
            Err(FetchError::Transport(_)) => entry.transport_error += 1,
            Err(FetchError::ParseFailure(_)) => entry.parse_failure += 1,
        }
    }

    /// Returns a copy of the counters for one exchange.
    pub fn get(&self, exchange: &str) -> ExchangeFetchStats {
        self.per_exchange
            .lock()
            .get(exchange)
            .copied()
            .unwrap_or_default()
    }

    /// Returns a copy of all counters, keyed by exchange name.
    pub fn snapshot(&self) -> BTreeMap<String, ExchangeFetchStats> {
        self.per_exchange.lock().clone()
    }

    /// Sums counters over all exchanges.
    pub fn totals(&self) -> ExchangeFetchStats {
        self.per_exchange
            .lock()
            .values()
            .fold(ExchangeFetchStats::default(), |mut acc, s| {
                acc.success += s.success;
                acc.rate_limited += s.rate_limited;
                acc.transport_error += s.transport_error;
                acc.parse_failure += s.parse_failure;
                acc
            })
    }
}

/// PriceFetcher queries every registered exchange for a pair at once.
pub struct PriceFetcher {
    http_client: HttpClient,
    request_timeout: Duration,
    stats: FetchStats,
}

impl PriceFetcher {
    /// Creates a fetcher whose requests are bounded by `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let request_timeout = if request_timeout.is_zero() {
            DEFAULT_REQUEST_TIMEOUT
        } else {
            request_timeout
        };

        let http_client = HttpClient::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http_client,
            request_timeout,
            stats: FetchStats::default(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// Builds the snapshot for one pair.
    ///
    /// While paused no request is issued and the snapshot is empty. Otherwise
    /// all exchanges are queried concurrently and every failed exchange is
    /// simply left out. Quotes end up in registry order.
    pub async fn fetch_snapshot(
        &self,
        pair: &Pair,
        registry: &Registry,
        state: &RuntimeState,
    ) -> PriceSnapshot {
        let mut snapshot = PriceSnapshot::new(pair.clone());

        if state.is_paused() {
            trace!(pair = %pair, "Paused, skipping fetch");
            return snapshot;
        }

        let results = join_all(registry.iter().map(|adapter| async move {
            (adapter.name(), self.fetch_quote(adapter, pair).await)
        }))
        .await;

        for (exchange, result) in results {
            match result {
                Ok(quote) => {
                    self.stats.record(exchange, Ok(()));
                    trace!(
                        exchange = %exchange,
                        pair = %pair,
                        price = %quote.price,
                        "Quote received"
                    );
                    snapshot.insert(quote);
                }
                Err(e) => {
                    self.stats.record(exchange, Err(&e));
                    if is_routine_failure(&e) {
                        debug!(exchange = %exchange, pair = %pair, "Rate limited, no quote");
                    } else {
                        warn!(
                            exchange = %exchange,
                            pair = %pair,
                            kind = e.kind(),
                            error = %e,
                            "Quote unavailable"
                        );
                    }
                }
            }
        }

        snapshot
    }

    /// Fetches and parses one exchange quote.
    pub async fn fetch_quote(
        &self,
        adapter: &ExchangeAdapter,
        pair: &Pair,
    ) -> Result<PriceQuote, FetchError> {
        let url = adapter.build_url(pair);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()).into());
        }

        let body = response.bytes().await.map_err(classify_request_error)?;
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| TransportError::Body(e.to_string()))?;

        let price = adapter.parse(&value)?;
        Ok(PriceQuote::new(adapter.name(), pair.clone(), price))
    }
}

/// Rate limiting is an ordinary "no quote" answer; anything else is worth a warning.
fn is_routine_failure(e: &FetchError) -> bool {
    matches!(e, FetchError::RateLimited)
}

fn classify_request_error(e: reqwest::Error) -> FetchError {
    let transport = if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    };
    FetchError::Transport(transport)
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
