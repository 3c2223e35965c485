use eyre::{eyre, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::event_message;
use crate::arb::EngineEvent;

/// Telegram bot notifier posting to a single chat
#[derive(Debug)]
pub struct TelegramNotifier {
    /// The bot token
    token: String,
    /// Chat the messages go to
    chat_id: String,
    /// The HTTP client
    client: Client,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`
    ///
    /// # Errors
    /// * If either variable is not set
    /// * If the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        let token =
            std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| eyre!("TELEGRAM_BOT_TOKEN not set"))?;
        let chat_id =
            std::env::var("TELEGRAM_CHAT_ID").map_err(|_| eyre!("TELEGRAM_CHAT_ID not set"))?;
        Self::with_credentials(token, chat_id)
    }

    /// Create a new Telegram notifier with an explicit bot token and chat
    ///
    /// # Errors
    /// * If the HTTP client cannot be built
    pub fn with_credentials(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            token: token.into(),
            chat_id: chat_id.into(),
            client,
        })
    }

    /// Body of a `sendMessage` call carrying `text`
    #[must_use]
    pub fn payload(&self, text: &str) -> Value {
        json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true
        })
    }

    /// Send a message to the configured chat
    ///
    /// # Errors
    /// * If the request fails or Telegram answers with an error
    pub async fn send(&self, msg: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("https://api.telegram.org/bot{}/sendMessage", self.token))
            .json(&self.payload(msg))
            .send()
            .await?
            .json::<Value>()
            .await?;

        if !response["ok"].as_bool().unwrap_or(false) {
            return Err(eyre!(
                "Telegram API error: {}",
                response["description"].as_str().unwrap_or("unknown error")
            ));
        }

        Ok(())
    }

    /// Announce an engine event. Only executed arbitrages are worth a message.
    ///
    /// # Errors
    /// * If the request fails or Telegram answers with an error
    pub async fn send_event(&self, event: &EngineEvent) -> Result<()> {
        match event_message(event) {
            Some(message) => self.send(&message).await,
            None => Ok(()),
        }
    }
}
