//! Scheduled broadcasts: daily summary, global events, registry sweep.
//!
//! Every broadcast goes through the same path: render, take a duplicate
//! verdict on the rendered text, fan out concurrently to the opted-in
//! groups, then record the delivery in the content ledger. Per-group send
//! failures are logged and skipped; the rest of the fan-out proceeds.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DuplicationRules;
use crate::content::dedup::{self, DuplicateVerdict};
use crate::content::fingerprint;
use crate::reports;
use crate::storage::{RegistryStats, Store};
use crate::telegram::ChatGateway;
use crate::types::{BotCounters, ContentEntry, GroupFeature};

pub struct Broadcaster {
    store: Arc<dyn Store>,
    gateway: Arc<dyn ChatGateway>,
    rules: DuplicationRules,
}

impl Broadcaster {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn ChatGateway>,
        rules: DuplicationRules,
    ) -> Self {
        Self {
            store,
            gateway,
            rules,
        }
    }

    /// Render and send the daily market summary to every group that wants
    /// it. Returns the number of groups reached.
    pub async fn daily_summary(&self, counters: &mut BotCounters) -> Result<usize> {
        let active = self.store.active_opportunities().await?;
        let report = reports::daily_report(&active);
        let sent = self
            .send_to_groups(&report, "daily_summary", GroupFeature::DailySummary, counters)
            .await?;
        info!(groups = sent, active = active.len(), "Daily summary broadcast");
        Ok(sent)
    }

    /// Broadcast global events detected since `since`. Each event is
    /// deduplicated independently, so re-running the cycle does not
    /// re-announce events already sent inside the window.
    pub async fn broadcast_events(
        &self,
        since: DateTime<Utc>,
        counters: &mut BotCounters,
    ) -> Result<usize> {
        let events = self.store.recent_events(since).await?;
        let mut sent_total = 0;
        for event in &events {
            let text = reports::event_broadcast(event);
            sent_total += self
                .send_to_groups(&text, "global_event", GroupFeature::GlobalEvents, counters)
                .await?;
        }
        if !events.is_empty() {
            info!(events = events.len(), deliveries = sent_total, "Event broadcast finished");
        }
        Ok(sent_total)
    }

    /// Periodic ledger sweep. Entries are never deleted; this only reports
    /// how much of the ledger has aged out of the suppression window.
    pub async fn sweep_registry(&self) -> Result<RegistryStats> {
        let stale_before = Utc::now() - self.rules.window();
        let stats = self.store.registry_stats(stale_before).await?;
        info!(
            total = stats.total_entries,
            stale = stats.stale_entries,
            "Registry sweep"
        );
        Ok(stats)
    }

    /// Age cutoff for the events cycle: anything older than one
    /// suppression window is history, not news.
    pub fn events_horizon(&self) -> DateTime<Utc> {
        Utc::now() - Duration::hours(self.rules.window_hours)
    }

    async fn send_to_groups(
        &self,
        text: &str,
        content_type: &str,
        feature: GroupFeature,
        counters: &mut BotCounters,
    ) -> Result<usize> {
        let fp = fingerprint(text);
        let now = Utc::now();
        let existing = self.store.get_content(&fp).await?;

        if dedup::verdict(existing.as_ref(), now, &self.rules) == DuplicateVerdict::Suppressed {
            debug!(content_type, "Broadcast suppressed as duplicate");
            counters.duplicates_suppressed += 1;
            return Ok(0);
        }

        let groups = self.store.groups_with(feature).await?;
        if groups.is_empty() {
            debug!(content_type, "No groups opted in");
            return Ok(0);
        }

        let sends = groups
            .iter()
            .map(|g| self.gateway.send_message(g.chat_id, text));
        let results = join_all(sends).await;

        let mut entry = existing;
        let mut delivered = 0;
        for (group, result) in groups.iter().zip(results) {
            match result {
                Ok(()) => {
                    delivered += 1;
                    counters.broadcasts_sent += 1;
                    entry = Some(match entry {
                        Some(mut e) => {
                            e.note_resend(group.chat_id, now);
                            e
                        }
                        None => ContentEntry::new(&fp, content_type, group.chat_id, now),
                    });
                }
                Err(err) => {
                    warn!(chat_id = group.chat_id, %err, "Broadcast send failed");
                }
            }
        }

        if let Some(entry) = entry {
            self.store.upsert_content(&entry).await?;
        }
        Ok(delivered)
    }
}
