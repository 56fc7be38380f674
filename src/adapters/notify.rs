//! Notifier implementations: Telegram push, log-only, and the fan-out
//! that delivers every message to all configured targets.
//!
//! Delivery is best-effort everywhere: a transport failure is logged and
//! swallowed, never surfaced to the pipeline.

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::ports::notifier::NotifierPort;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram Bot API `sendMessage` notifier.
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_base_url(TELEGRAM_API, token, chat_id)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        TelegramNotifier {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }
}

#[async_trait]
impl NotifierPort for TelegramNotifier {
    async fn send(&self, message: &str) {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let body = json!({ "chat_id": self.chat_id, "text": message });

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(status = %response.status(), "telegram delivery failed");
            }
            Err(e) => {
                warn!(error = %e, "telegram delivery failed");
            }
        }
    }
}

/// Notifier that only writes to the log. Always part of the fan-out so
/// decisions stay observable when no push transport is configured.
pub struct LogNotifier;

#[async_trait]
impl NotifierPort for LogNotifier {
    async fn send(&self, message: &str) {
        info!("{message}");
    }
}

/// Delivers each message to every configured target in order.
pub struct FanoutNotifier {
    targets: Vec<Box<dyn NotifierPort>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        FanoutNotifier {
            targets: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Box<dyn NotifierPort>) -> Self {
        self.targets.push(target);
        self
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

impl Default for FanoutNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifierPort for FanoutNotifier {
    async fn send(&self, message: &str) {
        for target in &self.targets {
            target.send(message).await;
        }
    }
}
