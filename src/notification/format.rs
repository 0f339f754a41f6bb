//! Telegram Markdown rendering of notification events.

use chrono::{DateTime, Utc};
use std::fmt::{Display, Write};
use std::time::Duration;

use super::notifier::{ErrorData, Event, OverviewData, ShutdownData, StartupData};
use crate::domain::ArbitrageAlert;

const TIME_FORMAT: &str = "%H:%M:%S UTC";

/// Line-oriented message builder.
///
/// Writing into a `String` cannot fail, so `fmt::Result`s are discarded.
struct Message(String);

impl Message {
    fn titled(title: impl Display) -> Self {
        let mut message = Message(String::new());
        let _ = writeln!(message.0, "{}", title);
        message
    }

    fn line(mut self, text: impl Display) -> Self {
        let _ = writeln!(self.0, "{}", text);
        self
    }

    /// Writes `label: value`. The value is escaped, the label is trusted.
    fn field(mut self, label: &str, value: impl Display) -> Self {
        let _ = writeln!(self.0, "{}: {}", label, escape_markdown(&value.to_string()));
        self
    }

    fn gap(mut self) -> Self {
        self.0.push('\n');
        self
    }

    fn stamped(mut self, at: DateTime<Utc>) -> String {
        let _ = write!(self.0, "⏰ {}", at.format(TIME_FORMAT));
        self.0
    }
}

/// Renders any event as a Telegram message.
pub fn format_event(event: &Event) -> String {
    match event {
        Event::Alert(alert) => format_alert(alert),
        Event::Error(data) => format_error(data, Utc::now()),
        Event::Startup(data) => format_startup(data, Utc::now()),
        Event::Shutdown(data) => format_shutdown(data, Utc::now()),
        Event::Overview(data) => format_overview(data, Utc::now()),
    }
}

/// Renders one divergence alert. The time shown is the detection time.
pub fn format_alert(alert: &ArbitrageAlert) -> String {
    let pair = alert.pair.to_string();

    Message::titled(format_args!("📊 *{}* #{}", pair, pair_tag(&pair)))
        .line(format_args!("{}: {:.4}", escape_markdown(&alert.exchange_a), alert.price_a))
        .line(format_args!("{}: {:.4}", escape_markdown(&alert.exchange_b), alert.price_b))
        .gap()
        .line(format_args!("Diff: *{:.2}%* ⚠️", alert.diff_percent()))
        .gap()
        .stamped(alert.detected_at)
}

fn format_error(data: &ErrorData, at: DateTime<Utc>) -> String {
    let mut message = Message::titled("⚠️ *Ошибка*")
        .gap()
        .field("Компонент", &data.component)
        .field("Сообщение", &data.message);
    if let Some(ref error) = data.error {
        message = message.field("Ошибка", error);
    }
    message.gap().stamped(at)
}

fn format_startup(data: &StartupData, at: DateTime<Utc>) -> String {
    Message::titled("✅ *Бот полностью активен.*")
        .gap()
        .line(format_args!(
            "{} v{}",
            escape_markdown(&data.name),
            escape_markdown(&data.version)
        ))
        .field("Биржи", data.exchanges.join(", "))
        .field("Пары", data.pairs.join(", "))
        .field("Порог", data.threshold)
        .field("Интервал", human_duration(data.scan_interval))
        .gap()
        .stamped(at)
}

fn format_shutdown(data: &ShutdownData, at: DateTime<Utc>) -> String {
    let status = if data.graceful { "✅ Graceful" } else { "⚠️ Forced" };

    Message::titled("🛑 *Бот остановлен*")
        .gap()
        .field("Причина", &data.reason)
        .field("Статус", status)
        .field("Время работы", human_duration(data.uptime))
        .gap()
        .stamped(at)
}

fn format_overview(data: &OverviewData, at: DateTime<Utc>) -> String {
    let mode = if data.paused { "⏸ PAUSED" } else { "▶️ RUNNING" };

    Message::titled(format_args!("📊 *Обзор мониторинга* {}", mode))
        .gap()
        .field("⏱ Время работы", human_duration(data.uptime))
        .field("🔄 Циклов сканирования", group_thousands(data.scan_cycles))
        .gap()
        .field("🔔 Обнаружено расхождений", group_thousands(data.alerts_detected))
        .field("🗑 Отброшено уведомлений", group_thousands(data.alerts_dropped))
        .field("📈 Получено котировок", group_thousands(data.quotes_fetched))
        .field("❌ Ошибок запросов", group_thousands(data.fetch_failures))
        .gap()
        .field("Порог", data.threshold)
        .gap()
        .stamped(at)
}

/// Escapes the legacy Markdown entity characters `_ * [ \``.
pub(crate) fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '[' | '`') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// "BTC/USDT" becomes the hashtag body "BTC\_USDT" (underscore escaped for Markdown).
pub(crate) fn pair_tag(pair: &str) -> String {
    pair.replace('/', "\\_")
}

/// Two most significant units, e.g. "2м 5с" or "1д 1ч".
pub(crate) fn human_duration(d: Duration) -> String {
    const UNITS: [(u64, &str); 4] = [(86_400, "д"), (3_600, "ч"), (60, "м"), (1, "с")];

    let secs = d.as_secs();
    let Some(pos) = UNITS.iter().position(|(size, _)| secs >= *size) else {
        return "0с".to_string();
    };

    let (major, major_name) = UNITS[pos];
    match UNITS.get(pos + 1) {
        Some((minor, minor_name)) => format!(
            "{}{} {}{}",
            secs / major,
            major_name,
            (secs % major) / minor,
            minor_name
        ),
        None => format!("{}{}", secs, major_name),
    }
}

/// 1234567 becomes "1,234,567".
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
