//! Telegram long-polling loop feeding the command handler.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::CommandHandler;
use crate::notification::{NotificationError, TelegramClient, Update};

const POLL_TIMEOUT: Duration = Duration::from_secs(25);
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// CommandListener polls `getUpdates` and answers commands from one chat.
pub struct CommandListener {
    client: TelegramClient,
    chat_id: String,
    handler: CommandHandler,
    poll_timeout: Duration,
}

impl CommandListener {
    pub fn new(
        client: TelegramClient,
        chat_id: impl Into<String>,
        handler: CommandHandler,
    ) -> Self {
        Self {
            client,
            chat_id: chat_id.into(),
            handler,
            poll_timeout: POLL_TIMEOUT,
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Polls forever. Errors are logged and retried after a short delay.
    pub async fn run(self) {
        info!(chat_id = %self.chat_id, "Command listener started");
        let mut offset = 0;
        loop {
            offset = match self.poll_once(offset).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(error = %e, "Failed to poll Telegram updates");
                    tokio::time::sleep(RETRY_DELAY).await;
                    offset
                }
            };
        }
    }

    /// Fetches one batch of updates, answers them, returns the next offset.
    pub async fn poll_once(&self, offset: i64) -> Result<i64, NotificationError> {
        let updates = self.client.get_updates(offset, self.poll_timeout).await?;

        let mut next = offset;
        for update in &updates {
            next = next.max(update.update_id + 1);
            if let Some(reply) = self.reply_to(update) {
                if let Err(e) = self.client.send_message(&self.chat_id, &reply).await {
                    warn!(error = %e, "Failed to send command reply");
                }
            }
        }
        Ok(next)
    }

    /// Returns the reply for one update, if it deserves one.
    fn reply_to(&self, update: &Update) -> Option<String> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?;

        if message.chat.id.to_string() != self.chat_id {
            warn!(chat_id = message.chat.id, "Ignoring command from unauthorized chat");
            return None;
        }

        let reply = self.handler.handle_text(text);
        if reply.is_none() {
            debug!(text = %text, "Ignoring message");
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{AlertHistory, RuntimeState};
    use crate::domain::Pair;
    use mockito::{Matcher, Server};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn listener(url: &str) -> (CommandListener, Arc<RuntimeState>) {
        let state = Arc::new(RuntimeState::new(Decimal::new(1, 3)).unwrap());
        let handler = CommandHandler::new(
            state.clone(),
            Arc::new(AlertHistory::new(5)),
            vec![Pair::new("BTC", "USDT")],
            vec!["Binance".to_string()],
        );
        let client = TelegramClient::with_base_url(url, "TOKEN").unwrap();
        let listener =
            CommandListener::new(client, "42", handler).with_poll_timeout(Duration::ZERO);
        (listener, state)
    }

    #[tokio::test]
    async fn test_poll_once_executes_authorized_commands() {
        let mut server = Server::new_async().await;
        let _updates = server
            .mock("GET", Matcher::Regex("^/botTOKEN/getUpdates".into()))
            .with_status(200)
            .with_body(
                r#"{"ok":true,"result":[
                    {"update_id":10,"message":{"chat":{"id":42},"text":"/pause"}},
                    {"update_id":11,"message":{"chat":{"id":7},"text":"/threshold 0.5"}}
                ]}"#,
            )
            .create_async()
            .await;
        let reply = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::PartialJson(serde_json::json!({"chat_id": "42"})))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let (listener, state) = listener(&server.url());
        let next = listener.poll_once(0).await.unwrap();

        assert_eq!(next, 12);
        assert!(state.is_paused());
        // The command from chat 7 was ignored
        assert_eq!(state.threshold(), Decimal::new(1, 3));
        reply.assert_async().await;
    }

    #[tokio::test]
    async fn test_poll_once_without_updates_keeps_offset() {
        let mut server = Server::new_async().await;
        let _updates = server
            .mock("GET", Matcher::Regex("^/botTOKEN/getUpdates".into()))
            .with_status(200)
            .with_body(r#"{"ok":true,"result":[]}"#)
            .create_async()
            .await;

        let (listener, _) = listener(&server.url());
        assert_eq!(listener.poll_once(5).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_poll_once_propagates_api_errors() {
        let mut server = Server::new_async().await;
        let _updates = server
            .mock("GET", Matcher::Regex("^/botTOKEN/getUpdates".into()))
            .with_status(409)
            .with_body(r#"{"ok":false,"description":"Conflict"}"#)
            .create_async()
            .await;

        let (listener, _) = listener(&server.url());
        assert!(listener.poll_once(0).await.is_err());
    }
}
