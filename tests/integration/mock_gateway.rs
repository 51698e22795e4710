//! In-memory `ChatGateway` for integration testing.
//!
//! Records every send and delete, and serves queued inbound messages
//! from `poll_updates` so router tests can drive the full dispatch path.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use rasid::telegram::{ChatGateway, InboundMessage};

#[derive(Default)]
pub struct MockGateway {
    sent: Mutex<Vec<(i64, String)>>,
    deleted: Mutex<Vec<(i64, i64)>>,
    inbound: Mutex<Vec<InboundMessage>>,
    /// If set, all operations will return this error.
    force_error: Mutex<Option<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Queue an inbound message for the next `poll_updates`.
    pub fn push_inbound(&self, msg: InboundMessage) {
        self.inbound.lock().unwrap().push(msg);
    }

    /// All messages sent so far, in order.
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages sent to one chat.
    pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<(i64, i64)> {
        self.deleted.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<()> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.check_error()?;
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.check_error()?;
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn poll_updates(&self) -> Result<Vec<InboundMessage>> {
        self.check_error()?;
        Ok(self.inbound.lock().unwrap().drain(..).collect())
    }

    fn name(&self) -> &str {
        "mock-gateway"
    }
}
