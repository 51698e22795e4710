//! In-memory `Store` for integration testing.
//!
//! All state lives behind mutexes so tests can inspect it while the
//! engine holds the store through an `Arc`. No persistence, no SQL.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use rasid::storage::{RegistryStats, Store};
use rasid::types::{ContentEntry, GlobalEvent, GroupFeature, GroupSettings, Opportunity};

#[derive(Default)]
pub struct MockStore {
    opportunities: Mutex<Vec<Opportunity>>,
    content: Mutex<HashMap<String, ContentEntry>>,
    groups: Mutex<HashMap<i64, GroupSettings>>,
    events: Mutex<Vec<GlobalEvent>>,
    /// If set, all operations will return this error.
    force_error: Mutex<Option<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    /// Seed a group row, optionally flipping toggles first.
    pub fn seed_group(&self, settings: GroupSettings) {
        self.groups
            .lock()
            .unwrap()
            .insert(settings.chat_id, settings);
    }

    pub fn all_opportunities(&self) -> Vec<Opportunity> {
        self.opportunities.lock().unwrap().clone()
    }

    pub fn all_events(&self) -> Vec<GlobalEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn content_entry(&self, fingerprint: &str) -> Option<ContentEntry> {
        self.content.lock().unwrap().get(fingerprint).cloned()
    }

    pub fn group(&self, chat_id: i64) -> Option<GroupSettings> {
        self.groups.lock().unwrap().get(&chat_id).cloned()
    }

    fn check_error(&self) -> Result<()> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MockStore {
    async fn insert_opportunity(&self, opp: &Opportunity) -> Result<()> {
        self.check_error()?;
        self.opportunities.lock().unwrap().push(opp.clone());
        Ok(())
    }

    async fn update_opportunity(&self, opp: &Opportunity) -> Result<()> {
        self.check_error()?;
        let mut opps = self.opportunities.lock().unwrap();
        let slot = opps
            .iter_mut()
            .find(|o| o.id == opp.id)
            .ok_or_else(|| anyhow!("Opportunity not found: {}", opp.id))?;
        *slot = opp.clone();
        Ok(())
    }

    async fn get_opportunity(&self, id: Uuid) -> Result<Option<Opportunity>> {
        self.check_error()?;
        Ok(self
            .opportunities
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn active_opportunities(&self) -> Result<Vec<Opportunity>> {
        self.check_error()?;
        Ok(self
            .opportunities
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.is_active())
            .cloned()
            .collect())
    }

    async fn find_active(&self, symbol: &str, strategy: &str) -> Result<Option<Opportunity>> {
        self.check_error()?;
        Ok(self
            .opportunities
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.is_active() && o.symbol == symbol && o.strategy == strategy)
            .cloned())
    }

    async fn get_content(&self, fingerprint: &str) -> Result<Option<ContentEntry>> {
        self.check_error()?;
        Ok(self.content.lock().unwrap().get(fingerprint).cloned())
    }

    async fn upsert_content(&self, entry: &ContentEntry) -> Result<()> {
        self.check_error()?;
        self.content
            .lock()
            .unwrap()
            .insert(entry.fingerprint.clone(), entry.clone());
        Ok(())
    }

    async fn registry_stats(&self, stale_before: DateTime<Utc>) -> Result<RegistryStats> {
        self.check_error()?;
        let content = self.content.lock().unwrap();
        Ok(RegistryStats {
            total_entries: content.len() as u64,
            stale_entries: content
                .values()
                .filter(|e| e.last_sent < stale_before)
                .count() as u64,
        })
    }

    async fn ensure_group(&self, chat_id: i64) -> Result<GroupSettings> {
        self.check_error()?;
        let mut groups = self.groups.lock().unwrap();
        Ok(groups
            .entry(chat_id)
            .or_insert_with(|| GroupSettings::new(chat_id))
            .clone())
    }

    async fn update_group(&self, settings: &GroupSettings) -> Result<()> {
        self.check_error()?;
        self.groups
            .lock()
            .unwrap()
            .insert(settings.chat_id, settings.clone());
        Ok(())
    }

    async fn groups_with(&self, feature: GroupFeature) -> Result<Vec<GroupSettings>> {
        self.check_error()?;
        let mut groups: Vec<GroupSettings> = self
            .groups
            .lock()
            .unwrap()
            .values()
            .filter(|g| g.has(feature))
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.chat_id);
        Ok(groups)
    }

    async fn insert_event(&self, event: &GlobalEvent) -> Result<()> {
        self.check_error()?;
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<GlobalEvent>> {
        self.check_error()?;
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.detected_at >= since)
            .cloned()
            .collect())
    }
}
