use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::notification::{
    Event, EventType, NotificationError, Notifier, format_event, truncate_chars,
};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_MESSAGE_LENGTH: usize = 4096;

/// Входящее обновление Telegram (getUpdates)
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// Входящее сообщение
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Минимальный клиент Telegram Bot API
#[derive(Clone)]
pub struct TelegramClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl TelegramClient {
    /// Создает клиента для бота с данным токеном
    pub fn new(bot_token: &str) -> Result<Self, NotificationError> {
        Self::with_base_url(TELEGRAM_API_URL, bot_token)
    }

    /// Создает клиента с другим адресом API (тесты, прокси)
    pub fn with_base_url(base_url: &str, bot_token: &str) -> Result<Self, NotificationError> {
        if bot_token.is_empty() {
            return Err(NotificationError::new("bot_token is required"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: format!("{}/bot{}", base_url.trim_end_matches('/'), bot_token),
        })
    }

    /// Отправляет сообщение в Markdown, обрезая его до лимита Telegram
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotificationError> {
        let text = truncate_chars(text, MAX_MESSAGE_LENGTH);

        let url = format!("{}/sendMessage", self.api_url);

        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::new(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotificationError::new(format!(
                "Telegram API error: {} - {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Long polling: ждет новые обновления начиная с `offset`
    pub async fn get_updates(
        &self,
        offset: i64,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, NotificationError> {
        let url = format!("{}/getUpdates", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", poll_timeout.as_secs().to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            // Запрос висит до poll_timeout, таймаут клиента должен быть больше
            .timeout(poll_timeout + DEFAULT_HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|e| NotificationError::new(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| NotificationError::new(format!("Invalid getUpdates response: {}", e)))?;

        if !status.is_success() || !body.ok {
            return Err(NotificationError::new(format!(
                "Telegram API error: {} - {}",
                status,
                body.description.unwrap_or_default()
            )));
        }

        Ok(body.result.unwrap_or_default())
    }
}

/// Конфигурация Telegram notifier
#[derive(Debug, Clone)]
pub struct TelegramNotifierConfig {
    /// ID чата для отправки уведомлений
    pub chat_id: String,
    /// Включить уведомления о расхождениях
    pub notify_alerts: bool,
    /// Включить уведомления об ошибках
    pub notify_errors: bool,
    /// Включить периодические обзоры
    pub notify_overview: bool,
}

impl TelegramNotifierConfig {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            notify_alerts: true,
            notify_errors: true,
            notify_overview: true,
        }
    }
}

impl From<&crate::config::TelegramConfig> for TelegramNotifierConfig {
    fn from(cfg: &crate::config::TelegramConfig) -> Self {
        Self {
            chat_id: cfg.chat_id.clone(),
            notify_alerts: cfg.notify_alerts,
            notify_errors: cfg.notify_errors,
            notify_overview: cfg.notify_overview,
        }
    }
}

/// Telegram Notifier для отправки уведомлений через Telegram Bot API
pub struct TelegramNotifier {
    config: TelegramNotifierConfig,
    client: TelegramClient,
}

impl TelegramNotifier {
    /// Создает новый TelegramNotifier
    pub fn new(
        config: TelegramNotifierConfig,
        client: TelegramClient,
    ) -> Result<Self, NotificationError> {
        if config.chat_id.is_empty() {
            return Err(NotificationError::new("chat_id is required"));
        }
        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        if !self.is_enabled(event.kind()) {
            debug!(event_type = %event.kind(), "Notification disabled, skipping");
            return Ok(());
        }

        let text = format_event(event);
        self.client.send_message(&self.config.chat_id, &text).await
    }

    fn is_enabled(&self, event_type: EventType) -> bool {
        match event_type {
            EventType::Startup | EventType::Shutdown => true,
            EventType::Alert => self.config.notify_alerts,
            EventType::Error => self.config.notify_errors,
            EventType::Overview => self.config.notify_overview,
        }
    }

    async fn close(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArbitrageAlert, Pair, PriceQuote};
    use mockito::{Matcher, Server};
    use rust_decimal::Decimal;

    fn alert_event() -> Event {
        let pair = Pair::new("BTC", "USDT");
        let a = PriceQuote::new("Binance", pair.clone(), Decimal::new(100, 0));
        let b = PriceQuote::new("OKX", pair, Decimal::new(101, 0));
        Event::Alert(ArbitrageAlert::from_quotes(&a, &b).unwrap())
    }

    #[test]
    fn test_client_requires_token() {
        assert!(TelegramClient::new("").is_err());
    }

    #[test]
    fn test_notifier_requires_chat_id() {
        let client = TelegramClient::new("token").unwrap();
        assert!(TelegramNotifier::new(TelegramNotifierConfig::new(""), client).is_err());
    }

    #[tokio::test]
    async fn test_send_message_posts_markdown() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "chat_id": "42",
                "parse_mode": "Markdown"
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = TelegramClient::with_base_url(&server.url(), "TOKEN").unwrap();
        client.send_message("42", "hello").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_message_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok":false,"description":"Bad Request: chat not found"}"#)
            .create_async()
            .await;

        let client = TelegramClient::with_base_url(&server.url(), "TOKEN").unwrap();
        let err = client.send_message("42", "hello").await.unwrap_err();

        assert!(err.message.contains("chat not found"));
    }

    #[tokio::test]
    async fn test_get_updates_parses_messages() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/botTOKEN/getUpdates")
            .match_query(Matcher::UrlEncoded("offset".into(), "7".into()))
            .with_status(200)
            .with_body(
                r#"{"ok":true,"result":[
                    {"update_id":7,"message":{"chat":{"id":42},"text":"/ping"}},
                    {"update_id":8,"edited_message":{"chat":{"id":42},"text":"x"}}
                ]}"#,
            )
            .create_async()
            .await;

        let client = TelegramClient::with_base_url(&server.url(), "TOKEN").unwrap();
        let updates = client.get_updates(7, Duration::ZERO).await.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].update_id, 7);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.text.as_deref(), Some("/ping"));
        assert!(updates[1].message.is_none());
    }

    #[tokio::test]
    async fn test_get_updates_not_ok() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex("^/botTOKEN/getUpdates".into()))
            .with_status(401)
            .with_body(r#"{"ok":false,"description":"Unauthorized"}"#)
            .create_async()
            .await;

        let client = TelegramClient::with_base_url(&server.url(), "TOKEN").unwrap();
        let err = client.get_updates(0, Duration::ZERO).await.unwrap_err();

        assert!(err.message.contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_notifier_skips_disabled_events() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = TelegramClient::with_base_url(&server.url(), "TOKEN").unwrap();
        let mut config = TelegramNotifierConfig::new("42");
        config.notify_alerts = false;
        let notifier = TelegramNotifier::new(config, client).unwrap();

        notifier.send(&alert_event()).await.unwrap();

        assert!(!notifier.is_enabled(EventType::Alert));
        assert!(notifier.is_enabled(EventType::Startup));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_notifier_sends_alert() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::Regex("BTC/USDT".into()))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client = TelegramClient::with_base_url(&server.url(), "TOKEN").unwrap();
        let notifier = TelegramNotifier::new(TelegramNotifierConfig::new("42"), client).unwrap();

        notifier.send(&alert_event()).await.unwrap();
        mock.assert_async().await;
    }
}
