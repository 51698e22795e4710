//! Goal monitor — the periodic price-scan cycle.
//!
//! Each cycle loads the active opportunities, fetches a quote per symbol,
//! runs the tracker, persists any advancement, and notifies opted-in
//! groups. A failing quote or send skips that opportunity and the cycle
//! carries on; a tracker integrity error marks the cycle but never stops
//! it.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::quotes::QuoteSource;
use crate::reports;
use crate::storage::Store;
use crate::telegram::ChatGateway;
use crate::tracker::{GoalTracker, TrackerEvent};
use crate::types::{BotCounters, GroupFeature};

/// What one scan cycle did, for the cycle-summary log line.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub checked: usize,
    pub targets_reached: usize,
    pub completed: usize,
    pub successors_created: usize,
    pub errors: usize,
}

pub struct GoalMonitor {
    store: Arc<dyn Store>,
    gateway: Arc<dyn ChatGateway>,
    quotes: Arc<dyn QuoteSource>,
    tracker: GoalTracker,
}

impl GoalMonitor {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn ChatGateway>,
        quotes: Arc<dyn QuoteSource>,
        tracker: GoalTracker,
    ) -> Self {
        Self {
            store,
            gateway,
            quotes,
            tracker,
        }
    }

    /// Run one full scan over the active opportunities.
    pub async fn scan_cycle(&self, counters: &mut BotCounters) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        let active = self.store.active_opportunities().await?;
        counters.scan_cycles += 1;

        for mut opp in active {
            report.checked += 1;

            let quote = match self.quotes.current_price(&opp.symbol).await {
                Ok(quote) => quote,
                Err(err) => {
                    warn!(symbol = %opp.symbol, %err, "Quote failed, skipping opportunity");
                    report.errors += 1;
                    continue;
                }
            };

            let events = match self.tracker.check(&mut opp, quote.price) {
                Ok(events) => events,
                Err(err) => {
                    error!(id = %opp.id, %err, "Tracker rejected opportunity");
                    report.errors += 1;
                    continue;
                }
            };
            if events.is_empty() {
                continue;
            }

            // Advancement is persisted before any notification goes out, so
            // a failed send never replays a target on the next cycle.
            self.store.update_opportunity(&opp).await?;

            for event in &events {
                self.apply_event(event, &mut report, counters).await;
            }
        }

        info!(
            checked = report.checked,
            targets = report.targets_reached,
            completed = report.completed,
            successors = report.successors_created,
            errors = report.errors,
            "Scan cycle finished"
        );
        Ok(report)
    }

    async fn apply_event(
        &self,
        event: &TrackerEvent,
        report: &mut CycleReport,
        counters: &mut BotCounters,
    ) {
        match event {
            TrackerEvent::TargetReached { .. } => {
                report.targets_reached += 1;
                counters.goals_reached += 1;
            }
            TrackerEvent::Completed { .. } => report.completed += 1,
            TrackerEvent::SuccessorCreated { successor } => {
                // One active opportunity per (symbol, strategy); if a
                // concurrent path created one, the successor is dropped.
                match self
                    .store
                    .find_active(&successor.symbol, &successor.strategy)
                    .await
                {
                    Ok(None) => match self.store.insert_opportunity(successor).await {
                        Ok(()) => report.successors_created += 1,
                        Err(err) => {
                            error!(id = %successor.id, %err, "Failed to persist successor");
                            report.errors += 1;
                            return;
                        }
                    },
                    Ok(Some(existing)) => {
                        warn!(
                            symbol = %successor.symbol,
                            existing = %existing.id,
                            "Active opportunity already exists, dropping successor"
                        );
                        return;
                    }
                    Err(err) => {
                        error!(symbol = %successor.symbol, %err, "Uniqueness check failed");
                        report.errors += 1;
                        return;
                    }
                }
            }
        }

        self.notify_groups(&reports::tracker_alert(event), report).await;
    }

    /// Fan a goal alert out to every group with stock analysis enabled.
    async fn notify_groups(&self, text: &str, report: &mut CycleReport) {
        let groups = match self.store.groups_with(GroupFeature::StockAnalysis).await {
            Ok(groups) => groups,
            Err(err) => {
                error!(%err, "Failed to load groups for goal alert");
                report.errors += 1;
                return;
            }
        };

        for group in groups {
            if let Err(err) = self.gateway.send_message(group.chat_id, text).await {
                warn!(chat_id = group.chat_id, %err, "Goal alert send failed");
                report.errors += 1;
            }
        }
    }
}
