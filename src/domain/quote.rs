//! Price quotes and per-cycle snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Pair;

/// PriceQuote is one exchange's last traded price for a pair at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Exchange name as registered in the adapter registry.
    pub exchange: String,
    pub pair: Pair,
    /// Always strictly positive.
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(exchange: impl Into<String>, pair: Pair, price: Decimal) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            price,
            observed_at: Utc::now(),
        }
    }
}

/// PriceSnapshot holds the quotes collected for one pair in one scan cycle.
///
/// Only exchanges whose fetch succeeded are present. Quotes keep the order in
/// which they were inserted, which the fetcher aligns with registry order.
#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    pair: Pair,
    quotes: Vec<PriceQuote>,
}

impl PriceSnapshot {
    /// Creates an empty snapshot for the given pair.
    pub fn new(pair: Pair) -> Self {
        Self {
            pair,
            quotes: Vec::new(),
        }
    }

    /// Adds a quote, replacing an earlier quote from the same exchange.
    pub fn insert(&mut self, quote: PriceQuote) {
        match self.quotes.iter_mut().find(|q| q.exchange == quote.exchange) {
            Some(existing) => *existing = quote,
            None => self.quotes.push(quote),
        }
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }

    /// Returns the quote for an exchange, if it was fetched successfully.
    pub fn get(&self, exchange: &str) -> Option<&PriceQuote> {
        self.quotes.iter().find(|q| q.exchange == exchange)
    }

    pub fn quotes(&self) -> &[PriceQuote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Pair {
        Pair::new("BTC", "USDT")
    }

    #[test]
    fn test_new_snapshot_is_empty() {
        let snapshot = PriceSnapshot::new(pair());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.pair().to_string(), "BTC/USDT");
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut snapshot = PriceSnapshot::new(pair());
        snapshot.insert(PriceQuote::new("Binance", pair(), Decimal::new(100, 0)));
        snapshot.insert(PriceQuote::new("KuCoin", pair(), Decimal::new(101, 0)));

        let names: Vec<_> = snapshot.quotes().iter().map(|q| q.exchange.as_str()).collect();
        assert_eq!(names, vec!["Binance", "KuCoin"]);
    }

    #[test]
    fn test_insert_replaces_same_exchange() {
        let mut snapshot = PriceSnapshot::new(pair());
        snapshot.insert(PriceQuote::new("Binance", pair(), Decimal::new(100, 0)));
        snapshot.insert(PriceQuote::new("Binance", pair(), Decimal::new(105, 0)));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("Binance").unwrap().price, Decimal::new(105, 0));
        assert!(snapshot.get("OKX").is_none());
    }
}
