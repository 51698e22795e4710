//! Inbound message router.
//!
//! One entry point, `handle`, dispatches each message in fixed order:
//! commands first, then the scrubber (group chats only), then symbol
//! lookups, then free-text classification. Scrubbing runs before symbol
//! handling so a forbidden message never triggers an analysis reply.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, DuplicationRules};
use crate::content::classifier::Classifier;
use crate::content::dedup::{self, DuplicateVerdict};
use crate::content::scrubber::Scrubber;
use crate::content::fingerprint;
use crate::quotes::QuoteSource;
use crate::reports;
use crate::storage::Store;
use crate::telegram::{ChatGateway, InboundMessage};
use crate::types::{BotCounters, ContentCategory, ContentEntry, EventSeverity, GlobalEvent, GroupFeature};

/// Parse a Tadawul symbol: all-digit text within the configured range.
pub fn parse_symbol(text: &str, min: u32, max: u32) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match trimmed.parse::<u32>() {
        Ok(n) if (min..=max).contains(&n) => Some(trimmed),
        _ => None,
    }
}

pub struct MessageRouter {
    store: Arc<dyn Store>,
    gateway: Arc<dyn ChatGateway>,
    quotes: Arc<dyn QuoteSource>,
    classifier: Classifier,
    scrubber: Scrubber,
    rules: DuplicationRules,
    admin_ids: Vec<i64>,
    symbol_min: u32,
    symbol_max: u32,
}

impl MessageRouter {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn Store>,
        gateway: Arc<dyn ChatGateway>,
        quotes: Arc<dyn QuoteSource>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            gateway,
            quotes,
            classifier: Classifier::new(&config.categories),
            scrubber: Scrubber::new()?,
            rules: config.duplication.clone(),
            admin_ids: config.bot.admin_ids.clone(),
            symbol_min: config.market.symbol_min,
            symbol_max: config.market.symbol_max,
        })
    }

    /// Dispatch one inbound message.
    ///
    /// Collaborator failures are logged and answered with a generic error
    /// reply; they never poison the poll loop.
    pub async fn handle(&self, msg: &InboundMessage, counters: &mut BotCounters) -> Result<()> {
        counters.messages_handled += 1;

        let mut settings = self.store.ensure_group(msg.chat_id).await?;
        settings.last_active = Utc::now();
        self.store.update_group(&settings).await?;

        let text = msg.text.trim();

        if text.starts_with("/start") {
            return self.gateway.send_message(msg.chat_id, &reports::welcome()).await;
        }
        if text.starts_with("/settings") {
            return self.handle_settings(msg, text).await;
        }

        if msg.is_group && settings.has(GroupFeature::ContentScrubbing)
            && self.scrubber.should_remove(text)
        {
            info!(chat_id = msg.chat_id, message_id = msg.message_id, "Scrubbing message");
            self.gateway.delete_message(msg.chat_id, msg.message_id).await?;
            self.gateway
                .send_message(msg.chat_id, &reports::scrub_warning())
                .await?;
            counters.messages_scrubbed += 1;
            return Ok(());
        }

        if let Some(symbol) = parse_symbol(text, self.symbol_min, self.symbol_max) {
            if settings.has(GroupFeature::StockAnalysis) {
                return self.handle_symbol(msg.chat_id, symbol, counters).await;
            }
            debug!(chat_id = msg.chat_id, symbol, "Analysis disabled for group");
            return Ok(());
        }

        self.handle_free_text(text).await
    }

    async fn handle_settings(&self, msg: &InboundMessage, text: &str) -> Result<()> {
        let mut parts = text.split_whitespace();
        let _command = parts.next();
        let args: Vec<&str> = parts.collect();

        if args.is_empty() {
            let settings = self.store.ensure_group(msg.chat_id).await?;
            return self
                .gateway
                .send_message(msg.chat_id, &reports::settings_menu(&settings))
                .await;
        }

        // Toggle form: /settings <name> on|off — admins only when a list
        // is configured.
        if !self.admin_ids.is_empty()
            && !msg.from_id.map(|id| self.admin_ids.contains(&id)).unwrap_or(false)
        {
            warn!(chat_id = msg.chat_id, from = ?msg.from_id, "Settings change denied");
            return self
                .gateway
                .send_message(msg.chat_id, &reports::admin_only())
                .await;
        }

        let on = match args.get(1).copied() {
            Some("on") => true,
            Some("off") => false,
            _ => {
                let settings = self.store.ensure_group(msg.chat_id).await?;
                return self
                    .gateway
                    .send_message(msg.chat_id, &reports::settings_menu(&settings))
                    .await;
            }
        };

        let mut settings = self.store.ensure_group(msg.chat_id).await?;
        if settings.apply_toggle(args[0], on) {
            settings.last_active = Utc::now();
            self.store.update_group(&settings).await?;
            info!(chat_id = msg.chat_id, toggle = args[0], on, "Group setting changed");
        } else {
            warn!(chat_id = msg.chat_id, toggle = args[0], "Unknown settings toggle");
        }
        self.gateway
            .send_message(msg.chat_id, &reports::settings_menu(&settings))
            .await
    }

    async fn handle_symbol(
        &self,
        chat_id: i64,
        symbol: &str,
        counters: &mut BotCounters,
    ) -> Result<()> {
        let fp = fingerprint(symbol);
        let now = Utc::now();
        let existing = self.store.get_content(&fp).await?;

        match dedup::verdict(existing.as_ref(), now, &self.rules) {
            DuplicateVerdict::Suppressed => {
                debug!(chat_id, symbol, "Analysis suppressed as duplicate");
                counters.duplicates_suppressed += 1;
                return self
                    .gateway
                    .send_message(chat_id, &reports::duplicate_notice())
                    .await;
            }
            DuplicateVerdict::Fresh | DuplicateVerdict::Resend => {}
        }

        let quote = match self.quotes.current_price(symbol).await {
            Ok(quote) => quote,
            Err(err) => {
                error!(symbol, %err, "Quote lookup failed");
                return self
                    .gateway
                    .send_message(chat_id, &reports::error_notice())
                    .await;
            }
        };

        self.gateway
            .send_message(chat_id, &reports::analysis_card(&quote))
            .await?;
        counters.analyses_sent += 1;

        // The ledger records the send only after it happened.
        let entry = match existing {
            Some(mut entry) => {
                entry.note_resend(chat_id, now);
                entry
            }
            None => ContentEntry::new(&fp, "stock_analysis", chat_id, now),
        };
        self.store.upsert_content(&entry).await
    }

    async fn handle_free_text(&self, text: &str) -> Result<()> {
        let category = self.classifier.classify(text);
        debug!(%category, "Message classified");

        if category == ContentCategory::GlobalEvent {
            let event = GlobalEvent::new(text, EventSeverity::Medium);
            info!(id = %event.id, "Global event recorded");
            self.store.insert_event(&event).await?;
        }
        Ok(())
    }
}
