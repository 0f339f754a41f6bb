use rust_decimal::Decimal;
use std::fmt;
use std::time::Duration;

use crate::domain::ArbitrageAlert;

/// Вид события, по которому notifier решает, отправлять ли его
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Alert,
    Error,
    Startup,
    Shutdown,
    Overview,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Alert => "alert",
            EventType::Error => "error",
            EventType::Startup => "startup",
            EventType::Shutdown => "shutdown",
            EventType::Overview => "overview",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Сбой компонента, о котором стоит сообщить в чат
#[derive(Debug, Clone)]
pub struct ErrorData {
    pub component: String,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StartupData {
    pub name: String,
    pub version: String,
    pub exchanges: Vec<String>,
    pub pairs: Vec<String>,
    pub threshold: Decimal,
    pub scan_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ShutdownData {
    pub reason: String,
    pub uptime: Duration,
    pub graceful: bool,
}

/// Сводка за время работы, отправляется по таймеру
#[derive(Debug, Clone)]
pub struct OverviewData {
    pub uptime: Duration,
    pub scan_cycles: u64,
    pub alerts_detected: u64,
    pub alerts_dropped: u64,
    pub quotes_fetched: u64,
    pub fetch_failures: u64,
    pub threshold: Decimal,
    pub paused: bool,
}

/// Событие уведомления вместе с его данными
#[derive(Debug, Clone)]
pub enum Event {
    Alert(ArbitrageAlert),
    Error(ErrorData),
    Startup(StartupData),
    Shutdown(ShutdownData),
    Overview(OverviewData),
}

impl Event {
    pub fn kind(&self) -> EventType {
        match self {
            Event::Alert(_) => EventType::Alert,
            Event::Error(_) => EventType::Error,
            Event::Startup(_) => EventType::Startup,
            Event::Shutdown(_) => EventType::Shutdown,
            Event::Overview(_) => EventType::Overview,
        }
    }
}

/// Трейт для отправки уведомлений
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &Event) -> Result<(), NotificationError>;

    /// Включена ли отправка событий этого вида
    fn is_enabled(&self, event_type: EventType) -> bool;

    async fn close(&self) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("notification failed: {message}")]
pub struct NotificationError {
    pub message: String,
}

impl NotificationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Молчаливый notifier, когда Telegram выключен или не настроен
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait::async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _event: &Event) -> Result<(), NotificationError> {
        Ok(())
    }

    fn is_enabled(&self, _event_type: EventType) -> bool {
        false
    }

    async fn close(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Pair, PriceQuote};

    #[test]
    fn test_event_kind_follows_payload() {
        let pair = Pair::new("BTC", "USDT");
        let a = PriceQuote::new("Binance", pair.clone(), Decimal::new(100, 0));
        let b = PriceQuote::new("OKX", pair, Decimal::new(101, 0));
        let alert = ArbitrageAlert::from_quotes(&a, &b).unwrap();

        assert_eq!(Event::Alert(alert).kind(), EventType::Alert);
        assert_eq!(
            Event::Error(ErrorData {
                component: "test".to_string(),
                message: "boom".to_string(),
                error: None,
            })
            .kind(),
            EventType::Error
        );
    }

    #[test]
    fn test_event_type_display() {
        let names: Vec<String> = [
            EventType::Alert,
            EventType::Error,
            EventType::Startup,
            EventType::Shutdown,
            EventType::Overview,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        assert_eq!(names, ["alert", "error", "startup", "shutdown", "overview"]);
    }

    #[tokio::test]
    async fn test_noop_notifier_accepts_everything_silently() {
        let notifier = NoopNotifier;
        let event = Event::Shutdown(ShutdownData {
            reason: "test".to_string(),
            uptime: Duration::ZERO,
            graceful: true,
        });

        assert!(!notifier.is_enabled(EventType::Alert));
        assert!(notifier.send(&event).await.is_ok());
        assert!(notifier.close().await.is_ok());
    }
}
