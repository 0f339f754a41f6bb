//! Decoupled alert delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::ArbitrageAlert;
use crate::notification::{Event, Notifier};
use crate::storage::AlertStorage;

/// AlertSink accepts alerts from the scan loop.
///
/// `emit` must return immediately; delivery happens elsewhere.
pub trait AlertSink: Send + Sync {
    fn emit(&self, alert: ArbitrageAlert);
}

/// QueuedSink hands alerts to a background worker over a bounded queue.
///
/// The worker notifies and then, when storage is configured, persists each
/// alert. A full queue drops the alert and counts it.
pub struct QueuedSink {
    sender: Mutex<Option<mpsc::Sender<ArbitrageAlert>>>,
    dropped: AtomicU64,
}

impl QueuedSink {
    /// Starts the delivery worker and returns the sink with its task handle.
    pub fn spawn(
        capacity: usize,
        notifier: Arc<dyn Notifier>,
        storage: Option<Arc<dyn AlertStorage>>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(deliver(receiver, notifier, storage));

        let sink = Self {
            sender: Mutex::new(Some(sender)),
            dropped: AtomicU64::new(0),
        };
        (sink, worker)
    }

    /// Number of alerts dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops accepting alerts. The worker drains what is queued, then exits.
    pub fn close(&self) {
        self.sender.lock().take();
    }
}

impl AlertSink for QueuedSink {
    fn emit(&self, alert: ArbitrageAlert) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(pair = %alert.pair, "Sink closed, alert dropped");
            return;
        };

        match sender.try_send(alert) {
            Ok(()) => {}
            Err(TrySendError::Full(alert)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(pair = %alert.pair, "Alert queue full, alert dropped");
            }
            Err(TrySendError::Closed(alert)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(pair = %alert.pair, "Alert worker gone, alert dropped");
            }
        }
    }
}

async fn deliver(
    mut receiver: mpsc::Receiver<ArbitrageAlert>,
    notifier: Arc<dyn Notifier>,
    storage: Option<Arc<dyn AlertStorage>>,
) {
    while let Some(alert) = receiver.recv().await {
        if let Err(e) = notifier.send(&Event::Alert(alert.clone())).await {
            warn!(pair = %alert.pair, error = %e, "Failed to send alert notification");
        }

        if let Some(ref storage) = storage {
            if let Err(e) = storage.save(&alert).await {
                warn!(pair = %alert.pair, error = %e, "Failed to persist alert");
            }
        }
    }
    debug!("Alert delivery worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Pair, PriceQuote};
    use crate::notification::{EventType, NotificationError};
    use crate::storage::StorageError;
    use rust_decimal::Decimal;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Records every alert event it is asked to send.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<ArbitrageAlert>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, event: &Event) -> Result<(), NotificationError> {
            if let Event::Alert(alert) = event {
                self.sent.lock().push(alert.clone());
            }
            if self.fail {
                return Err(NotificationError::new("chat unreachable"));
            }
            Ok(())
        }

        fn is_enabled(&self, _event_type: EventType) -> bool {
            true
        }

        async fn close(&self) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    /// Blocks every send until released.
    struct StalledNotifier {
        release: Notify,
    }

    #[async_trait::async_trait]
    impl Notifier for StalledNotifier {
        async fn send(&self, _event: &Event) -> Result<(), NotificationError> {
            self.release.notified().await;
            Ok(())
        }

        fn is_enabled(&self, _event_type: EventType) -> bool {
            true
        }

        async fn close(&self) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStorage {
        saved: Mutex<Vec<ArbitrageAlert>>,
    }

    #[async_trait::async_trait]
    impl AlertStorage for MemoryStorage {
        async fn save(&self, alert: &ArbitrageAlert) -> Result<bool, StorageError> {
            self.saved.lock().push(alert.clone());
            Ok(true)
        }

        async fn recent(&self, limit: usize) -> Result<Vec<ArbitrageAlert>, StorageError> {
            Ok(self.saved.lock().iter().rev().take(limit).cloned().collect())
        }

        async fn count(&self) -> Result<i64, StorageError> {
            Ok(self.saved.lock().len() as i64)
        }

        async fn close(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn alert(exchange_b: &str) -> ArbitrageAlert {
        let pair = Pair::new("BTC", "USDT");
        let a = PriceQuote::new("Binance", pair.clone(), Decimal::new(100, 0));
        let b = PriceQuote::new(exchange_b, pair, Decimal::new(101, 0));
        ArbitrageAlert::from_quotes(&a, &b).unwrap()
    }

    #[tokio::test]
    async fn test_worker_notifies_then_persists() {
        let notifier = Arc::new(RecordingNotifier::default());
        let storage = Arc::new(MemoryStorage::default());
        let (sink, worker) = QueuedSink::spawn(
            8,
            notifier.clone(),
            Some(storage.clone() as Arc<dyn AlertStorage>),
        );

        sink.emit(alert("OKX"));
        sink.emit(alert("Huobi"));
        sink.close();
        worker.await.unwrap();

        assert_eq!(notifier.sent.lock().len(), 2);
        assert_eq!(storage.saved.lock().len(), 2);
        assert_eq!(storage.saved.lock()[1].exchange_b, "Huobi");
        assert_eq!(sink.dropped(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_still_persists() {
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let storage = Arc::new(MemoryStorage::default());
        let (sink, worker) =
            QueuedSink::spawn(8, notifier, Some(storage.clone() as Arc<dyn AlertStorage>));

        sink.emit(alert("OKX"));
        sink.close();
        worker.await.unwrap();

        assert_eq!(storage.saved.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let notifier = Arc::new(StalledNotifier {
            release: Notify::new(),
        });
        let (sink, _worker) = QueuedSink::spawn(1, notifier.clone(), None);

        // The worker takes the first alert and stalls on it; the next one
        // fills the queue and the rest are dropped.
        sink.emit(alert("A"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        for name in ["B", "C", "D"] {
            sink.emit(alert(name));
        }

        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(sink.dropped(), 2);
        notifier.release.notify_waiters();
    }

    #[tokio::test]
    async fn test_emit_after_close_is_dropped() {
        let (sink, worker) = QueuedSink::spawn(4, Arc::new(RecordingNotifier::default()), None);
        sink.close();
        sink.emit(alert("OKX"));

        assert_eq!(sink.dropped(), 1);
        worker.await.unwrap();
    }
}
