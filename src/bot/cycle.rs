//! One scan cycle: fetch every pair, scan each snapshot, emit alerts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info};

use super::{AlertHistory, AlertSink, RuntimeState};
use crate::arbitrage::scan;
use crate::domain::Pair;
use crate::exchanges::{PriceFetcher, Registry};

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pairs_scanned: usize,
    pub quotes: usize,
    pub alerts: usize,
    pub paused: bool,
    pub duration: Duration,
}

/// ScanCycle owns everything a cycle needs, so it can run on its own task.
pub struct ScanCycle {
    pairs: Vec<Pair>,
    registry: Arc<Registry>,
    fetcher: Arc<PriceFetcher>,
    state: Arc<RuntimeState>,
    sink: Arc<dyn AlertSink>,
    history: Arc<AlertHistory>,
    max_concurrent_pairs: usize,
}

impl ScanCycle {
    pub fn new(
        pairs: Vec<Pair>,
        registry: Arc<Registry>,
        fetcher: Arc<PriceFetcher>,
        state: Arc<RuntimeState>,
        sink: Arc<dyn AlertSink>,
        history: Arc<AlertHistory>,
        max_concurrent_pairs: usize,
    ) -> Self {
        Self {
            pairs,
            registry,
            fetcher,
            state,
            sink,
            history,
            max_concurrent_pairs: max_concurrent_pairs.max(1),
        }
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Runs the cycle once.
    ///
    /// Pairs are fetched with bounded concurrency. Alerts of one pair all come
    /// from the same snapshot; there is no ordering between pairs.
    pub async fn run(&self) -> CycleReport {
        let started = Instant::now();

        if self.state.is_paused() {
            debug!("Paused, skipping scan cycle");
            return CycleReport {
                paused: true,
                ..CycleReport::default()
            };
        }

        let per_pair: Vec<(usize, usize)> = stream::iter(self.pairs.clone())
            .map(|pair| async move { self.scan_pair(&pair).await })
            .buffer_unordered(self.max_concurrent_pairs)
            .collect()
            .await;

        let report = CycleReport {
            pairs_scanned: per_pair.len(),
            quotes: per_pair.iter().map(|(quotes, _)| quotes).sum(),
            alerts: per_pair.iter().map(|(_, alerts)| alerts).sum(),
            paused: false,
            duration: started.elapsed(),
        };

        info!(
            pairs = report.pairs_scanned,
            quotes = report.quotes,
            alerts = report.alerts,
            duration = ?report.duration,
            "Scan cycle finished"
        );

        report
    }

    /// Returns (quotes collected, alerts emitted) for one pair.
    async fn scan_pair(&self, pair: &Pair) -> (usize, usize) {
        let snapshot = self
            .fetcher
            .fetch_snapshot(pair, &self.registry, &self.state)
            .await;

        let mut alerts = 0;
        for alert in scan(&snapshot, &self.state) {
            info!(
                pair = %alert.pair,
                exchange_a = %alert.exchange_a,
                price_a = %alert.price_a,
                exchange_b = %alert.exchange_b,
                price_b = %alert.price_b,
                diff_percent = %alert.diff_percent().round_dp(4),
                "Price divergence detected"
            );
            self.history.push(alert.clone());
            self.sink.emit(alert);
            alerts += 1;
        }

        (snapshot.len(), alerts)
    }
}
