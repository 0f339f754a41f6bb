//! Command execution against the shared runtime state.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::{Command, CommandParseError};
use crate::bot::{AlertHistory, RuntimeState, StateError};
use crate::domain::{ArbitrageAlert, Pair};

const THRESHOLD_USAGE: &str = "/threshold 0.005";

/// CommandHandler executes chat commands and returns the reply text.
///
/// It knows nothing about the transport; the listener feeds it text and
/// sends back whatever it returns.
#[derive(Clone)]
pub struct CommandHandler {
    state: Arc<RuntimeState>,
    history: Arc<AlertHistory>,
    pairs: Arc<Vec<Pair>>,
    exchange_names: Arc<Vec<String>>,
}

impl CommandHandler {
    pub fn new(
        state: Arc<RuntimeState>,
        history: Arc<AlertHistory>,
        pairs: Vec<Pair>,
        exchange_names: Vec<String>,
    ) -> Self {
        Self {
            state,
            history,
            pairs: Arc::new(pairs),
            exchange_names: Arc::new(exchange_names),
        }
    }

    pub fn pause(&self) {
        self.state.pause();
    }

    pub fn resume(&self) {
        self.state.resume();
    }

    /// Applies a threshold given as text. Leaves the state untouched on error.
    pub fn set_threshold(&self, value: &str) -> Result<Decimal, StateError> {
        self.state.set_threshold_str(value)
    }

    pub fn list_pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Returns up to `n` recent alerts, newest first.
    pub fn recent_alerts(&self, n: usize) -> Vec<ArbitrageAlert> {
        self.history.recent(n)
    }

    /// Parses and executes `text`. Returns `None` for text that should get
    /// no reply (plain messages and unknown commands).
    pub fn handle_text(&self, text: &str) -> Option<String> {
        match text.parse::<Command>() {
            Ok(command) => Some(self.execute(&command)),
            Err(CommandParseError::InvalidArgument { usage, .. }) => {
                Some(format!("⚠️ Формат: {}", usage))
            }
            Err(CommandParseError::NotACommand | CommandParseError::Unknown(_)) => None,
        }
    }

    pub fn execute(&self, command: &Command) -> String {
        info!(command = %command, "Executing command");

        match command {
            Command::Start => "🤖 Бот запущен. Введите /help для команд.".to_string(),
            Command::Help => format!(
                "🧠 Команды:\n/ping\n/pause\n/resume\n{}\n/pairs\n/alerts 5\n/status",
                THRESHOLD_USAGE
            ),
            Command::Ping => "🏓 Я на связи!".to_string(),
            Command::Pause => {
                self.pause();
                "⏸ Остановлено".to_string()
            }
            Command::Resume => {
                self.resume();
                "▶️ Возобновлено".to_string()
            }
            Command::Threshold(arg) => match arg.as_deref().map(|v| self.set_threshold(v)) {
                Some(Ok(value)) => format!("✅ Новый порог: {}", value),
                Some(Err(_)) | None => format!("⚠️ Формат: {}", THRESHOLD_USAGE),
            },
            Command::Pairs => {
                let list: Vec<String> = self.pairs.iter().map(Pair::to_string).collect();
                format!("📋 Пары ({}):\n{}", list.len(), list.join("\n"))
            }
            Command::Alerts(n) => {
                let alerts = self.recent_alerts(n.unwrap_or(self.history.capacity()));
                if alerts.is_empty() {
                    return "📭 Пока нет сигналов".to_string();
                }
                let lines: Vec<String> = alerts.iter().map(format_alert_line).collect();
                format!("🔔 Последние сигналы ({}):\n{}", lines.len(), lines.join("\n"))
            }
            Command::Status => {
                let mode = if self.state.is_paused() {
                    "⏸ на паузе"
                } else {
                    "▶️ работает"
                };
                format!(
                    "ℹ️ Статус: {}\nПорог: {}\nПары: {}\nБиржи: {} ({})\nСигналов в истории: {}",
                    mode,
                    self.state.threshold(),
                    self.pairs.len(),
                    self.exchange_names.len(),
                    self.exchange_names.join(", "),
                    self.history.len()
                )
            }
        }
    }
}

fn format_alert_line(alert: &ArbitrageAlert) -> String {
    format!(
        "{} {}: {} {:.4} / {} {:.4} ({:.2}%)",
        alert.detected_at.format("%H:%M:%S"),
        alert.pair,
        alert.exchange_a,
        alert.price_a,
        alert.exchange_b,
        alert.price_b,
        alert.diff_percent()
    )
}
