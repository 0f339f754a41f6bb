//! Outgoing notifications and the Telegram Bot API client.

mod format;
mod notifier;
mod telegram;

pub use format::format_event;
pub(crate) use format::truncate_chars;
pub use notifier::{
    ErrorData, Event, EventType, NoopNotifier, NotificationError, Notifier, OverviewData,
    ShutdownData, StartupData,
};
pub use telegram::{TelegramClient, TelegramNotifier, TelegramNotifierConfig, Update};
