//! Pairwise relative-difference scanning of a price snapshot.

use std::iter::FusedIterator;

use rust_decimal::Decimal;

use crate::bot::RuntimeState;
use crate::domain::{ArbitrageAlert, PriceQuote, PriceSnapshot, relative_diff};

/// Scans a snapshot against the current threshold.
///
/// The threshold is read once, here, so a change made by a command between
/// two cycles is always picked up by the next call.
pub fn scan<'a>(snapshot: &'a PriceSnapshot, state: &RuntimeState) -> Scan<'a> {
    Scan::new(snapshot.quotes(), state.threshold())
}

/// Lazy iterator over the alerts of one snapshot.
///
/// Visits every unordered exchange pair `(i, j)` with `i < j` in snapshot
/// order and yields an alert when the relative diff is at or above the
/// threshold. Mirrored pairs are never produced.
#[derive(Debug)]
pub struct Scan<'a> {
    quotes: &'a [PriceQuote],
    threshold: Decimal,
    i: usize,
    j: usize,
}

impl<'a> Scan<'a> {
    pub fn new(quotes: &'a [PriceQuote], threshold: Decimal) -> Self {
        Self {
            quotes,
            threshold,
            i: 0,
            j: 1,
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = ArbitrageAlert;

    fn next(&mut self) -> Option<Self::Item> {
        while self.i + 1 < self.quotes.len() {
            if self.j >= self.quotes.len() {
                self.i += 1;
                self.j = self.i + 1;
                continue;
            }

            let (a, b) = (&self.quotes[self.i], &self.quotes[self.j]);
            self.j += 1;

            match relative_diff(a.price, b.price) {
                Some(diff) if diff >= self.threshold => return ArbitrageAlert::from_quotes(a, b),
                _ => continue,
            }
        }
        None
    }
}

impl FusedIterator for Scan<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pair;

    fn pair() -> Pair {
        Pair::new("BTC", "USDT")
    }

    fn snapshot(prices: &[(&str, Decimal)]) -> PriceSnapshot {
        let mut snapshot = PriceSnapshot::new(pair());
        for (exchange, price) in prices {
            snapshot.insert(PriceQuote::new(*exchange, pair(), *price));
        }
        snapshot
    }

    fn state(threshold: Decimal) -> RuntimeState {
        RuntimeState::new(threshold).unwrap()
    }

    #[test]
    fn test_scan_single_divergence_above_threshold() {
        let snap = snapshot(&[("A", Decimal::new(1000, 1)), ("B", Decimal::new(1005, 1))]);

        let alerts: Vec<_> = scan(&snap, &state(Decimal::new(1, 3))).collect();

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].exchange_a, "A");
        assert_eq!(alerts[0].exchange_b, "B");
        assert_eq!(alerts[0].relative_diff, Decimal::new(5, 3));
    }

    #[test]
    fn test_scan_below_threshold() {
        let snap = snapshot(&[("A", Decimal::new(1000, 1)), ("B", Decimal::new(1005, 1))]);
        assert_eq!(scan(&snap, &state(Decimal::new(1, 2))).count(), 0);
    }

    #[test]
    fn test_scan_threshold_is_inclusive() {
        let snap = snapshot(&[("A", Decimal::new(100, 0)), ("B", Decimal::new(1005, 1))]);
        assert_eq!(scan(&snap, &state(Decimal::new(5, 3))).count(), 1);
    }

    #[test]
    fn test_scan_empty_and_single_quote() {
        let empty = snapshot(&[]);
        assert_eq!(scan(&empty, &state(Decimal::ZERO)).count(), 0);

        let single = snapshot(&[("A", Decimal::new(100, 0))]);
        assert_eq!(scan(&single, &state(Decimal::ZERO)).count(), 0);
    }

    #[test]
    fn test_scan_enumerates_pairs_in_order_without_mirrors() {
        let snap = snapshot(&[
            ("A", Decimal::new(100, 0)),
            ("B", Decimal::new(101, 0)),
            ("C", Decimal::new(102, 0)),
            ("D", Decimal::new(103, 0)),
        ]);

        let pairs: Vec<_> = scan(&snap, &state(Decimal::ZERO))
            .map(|a| format!("{}-{}", a.exchange_a, a.exchange_b))
            .collect();

        assert_eq!(pairs, vec!["A-B", "A-C", "A-D", "B-C", "B-D", "C-D"]);
    }

    #[test]
    fn test_scan_skips_quiet_pairs() {
        let snap = snapshot(&[
            ("A", Decimal::new(100, 0)),
            ("B", Decimal::new(100, 0)),
            ("C", Decimal::new(110, 0)),
        ]);

        let alerts: Vec<_> = scan(&snap, &state(Decimal::new(5, 2))).collect();

        assert_eq!(alerts.len(), 2);
        assert_eq!((alerts[0].exchange_a.as_str(), alerts[0].exchange_b.as_str()), ("A", "C"));
        assert_eq!((alerts[1].exchange_a.as_str(), alerts[1].exchange_b.as_str()), ("B", "C"));
        assert_eq!(alerts[0].relative_diff, Decimal::new(1, 1));
    }

    #[test]
    fn test_scan_reads_threshold_at_call_time() {
        let snap = snapshot(&[("A", Decimal::new(100, 0)), ("B", Decimal::new(101, 0))]);
        let state = state(Decimal::new(1, 3));

        assert_eq!(scan(&snap, &state).count(), 1);
        state.set_threshold(Decimal::new(5, 2)).unwrap();
        assert_eq!(scan(&snap, &state).count(), 0);
    }

    #[test]
    fn test_scan_is_fused() {
        let snap = snapshot(&[("A", Decimal::new(100, 0)), ("B", Decimal::new(200, 0))]);
        let mut alerts = scan(&snap, &state(Decimal::ZERO));

        assert!(alerts.next().is_some());
        assert!(alerts.next().is_none());
        assert!(alerts.next().is_none());
    }
}
