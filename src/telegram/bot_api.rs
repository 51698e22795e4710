//! Telegram Bot API client.
//!
//! Implements `ChatGateway` over the HTTP Bot API: sendMessage,
//! deleteMessage, and getUpdates long-polling. The getUpdates offset is
//! tracked internally so each update is delivered once.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use tracing::debug;

use super::{ChatGateway, InboundMessage};

const API_BASE: &str = "https://api.telegram.org";
const GATEWAY_NAME: &str = "telegram";

// ---------------------------------------------------------------------------
// Wire types (Telegram JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct TelegramClient {
    http: Client,
    token: String,
    poll_timeout_secs: u64,
    /// Next getUpdates offset (last seen update_id + 1).
    offset: Mutex<i64>,
}

impl TelegramClient {
    pub fn new(token: String, poll_timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            // Must exceed the long-poll timeout or every quiet poll errors.
            .timeout(std::time::Duration::from_secs(poll_timeout_secs + 10))
            .user_agent("RASID/0.1.0 (saudi-stock-bot)")
            .build()
            .context("Failed to build HTTP client for Telegram")?;

        Ok(Self {
            http,
            token,
            poll_timeout_secs,
            offset: Mutex::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.token)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;

        let status = response.status();
        let parsed: TgResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram {method} response"))?;

        if !parsed.ok {
            anyhow::bail!(
                "Telegram {method} returned error ({status}): {}",
                parsed.description.unwrap_or_default()
            );
        }
        parsed
            .result
            .with_context(|| format!("Telegram {method} response missing result"))
    }

    fn reduce(update: TgUpdate) -> Option<InboundMessage> {
        let message = update.message?;
        let text = message.text?;
        let is_group = matches!(message.chat.kind.as_str(), "group" | "supergroup");
        Some(InboundMessage {
            chat_id: message.chat.id,
            message_id: message.message_id,
            from_id: message.from.map(|u| u.id),
            text,
            is_group,
        })
    }
}

#[async_trait]
impl ChatGateway for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "Markdown",
                    "disable_web_page_preview": true,
                }),
            )
            .await?;
        debug!(chat_id, "Message sent");
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "deleteMessage",
                serde_json::json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                }),
            )
            .await?;
        debug!(chat_id, message_id, "Message deleted");
        Ok(())
    }

    async fn poll_updates(&self) -> Result<Vec<InboundMessage>> {
        let offset = *self.offset.lock().unwrap();
        let updates: Vec<TgUpdate> = self
            .call(
                "getUpdates",
                serde_json::json!({
                    "offset": offset,
                    "timeout": self.poll_timeout_secs,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        if let Some(max_id) = updates.iter().map(|u| u.update_id).max() {
            *self.offset.lock().unwrap() = max_id + 1;
        }

        let messages: Vec<InboundMessage> = updates
            .into_iter()
            .filter_map(Self::reduce)
            .collect();

        if !messages.is_empty() {
            debug!(count = messages.len(), "Inbound messages received");
        }
        Ok(messages)
    }

    fn name(&self) -> &str {
        GATEWAY_NAME
    }
}
