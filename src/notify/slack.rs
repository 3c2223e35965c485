use eyre::Result;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::event_message;
use crate::arb::EngineEvent;

/// Slack notifier
#[derive(Debug)]
pub struct SlackNotifier {
    /// The Slack OAuth token
    token: String,
    /// The HTTP client
    client: Client,
}

impl SlackNotifier {
    /// Create a new Slack notifier from `SLACK_OAUTH_TOKEN`
    ///
    /// # Errors
    /// * If `SLACK_OAUTH_TOKEN` is not set
    /// * If the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        let token = std::env::var("SLACK_OAUTH_TOKEN")
            .map_err(|_| eyre::eyre!("SLACK_OAUTH_TOKEN not set"))?;
        Self::with_token(token)
    }

    /// Create a new Slack notifier with an explicit token
    ///
    /// # Errors
    /// * If the HTTP client cannot be built
    pub fn with_token(token: impl Into<String>) -> Result<Self> {
        // Create a client with a timeout
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            token: token.into(),
            client,
        })
    }

    /// Send a message to a specific channel
    ///
    /// # Errors
    /// * If the request fails or Slack answers with an error
    pub async fn send_to(&self, msg: &str, channel: &str) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "text": msg,
            "username": "Arbot",
            "icon_emoji": ":chart_with_upwards_trend:"
        });

        let response = self
            .client
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        // Check if Slack API returned success
        if !response["ok"].as_bool().unwrap_or(false) {
            return Err(eyre::eyre!(
                "Slack API error: {}",
                response["error"].as_str().unwrap_or("unknown error")
            ));
        }

        Ok(())
    }

    /// Send a message to the default channel
    ///
    /// # Errors
    /// * If the request fails or Slack answers with an error
    pub async fn send(&self, msg: &str) -> Result<()> {
        self.send_to(msg, "#arbitrage").await
    }

    /// Send an error message to the error channel
    ///
    /// # Errors
    /// * If the request fails or Slack answers with an error
    pub async fn send_error(&self, error: &str) -> Result<()> {
        self.send_to(&format!(":warning: Error: {error}"), "#arbitrage-errors")
            .await
    }

    /// Announce an engine event. Only executed arbitrages are worth a message.
    ///
    /// # Errors
    /// * If the request fails or Slack answers with an error
    pub async fn send_event(&self, event: &EngineEvent) -> Result<()> {
        match event_message(event) {
            Some(message) => self.send(&message).await,
            None => Ok(()),
        }
    }
}
