//! Chat gateway.
//!
//! Defines the `ChatGateway` trait the engine talks to and the Telegram
//! Bot API implementation behind it. The engine never sees Telegram's
//! wire format, only `InboundMessage` values and plain send/delete calls.

pub mod bot_api;

use anyhow::Result;
use async_trait::async_trait;

/// One inbound text message, already reduced to what the router needs.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// Sender id; absent for channel posts.
    pub from_id: Option<i64>,
    pub text: String,
    /// Whether the chat is a group or supergroup (vs a private chat).
    pub is_group: bool,
}

/// Abstraction over the chat service.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send a Markdown-formatted message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Delete a message from a chat (content scrubbing).
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Long-poll for new inbound messages. Returns an empty vec on a
    /// quiet timeout.
    async fn poll_updates(&self) -> Result<Vec<InboundMessage>>;

    /// Gateway name for logging.
    fn name(&self) -> &str;
}
