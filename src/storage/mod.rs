//! Persistence layer.
//!
//! The engine talks to the `Store` trait; `SqliteStore` is the production
//! implementation. Opportunities and registry entries are never deleted —
//! opportunities only transition status, the registry is an append-only
//! suppression ledger.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{ContentEntry, GlobalEvent, GroupFeature, GroupSettings, Opportunity};

/// Ledger statistics reported by the registry sweep.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub total_entries: u64,
    /// Entries whose `last_sent` is older than the suppression window.
    pub stale_entries: u64,
}

/// Relational storage for the bot's entities.
///
/// Implementations must serialize writes per entity (a transaction per
/// mutation is sufficient); the engine runs its cycles sequentially on a
/// single task.
#[async_trait]
pub trait Store: Send + Sync {
    // -- Opportunities ---------------------------------------------------

    async fn insert_opportunity(&self, opp: &Opportunity) -> Result<()>;
    async fn update_opportunity(&self, opp: &Opportunity) -> Result<()>;
    async fn get_opportunity(&self, id: Uuid) -> Result<Option<Opportunity>>;
    async fn active_opportunities(&self) -> Result<Vec<Opportunity>>;
    /// The active opportunity for a symbol under a strategy, if any.
    /// At most one exists at a time (creation enforces uniqueness).
    async fn find_active(&self, symbol: &str, strategy: &str) -> Result<Option<Opportunity>>;

    // -- Content registry ------------------------------------------------

    async fn get_content(&self, fingerprint: &str) -> Result<Option<ContentEntry>>;
    /// Insert or replace a ledger entry keyed by fingerprint.
    async fn upsert_content(&self, entry: &ContentEntry) -> Result<()>;
    async fn registry_stats(&self, stale_before: DateTime<Utc>) -> Result<RegistryStats>;

    // -- Group settings --------------------------------------------------

    /// Fetch a group's settings, creating the default row on first contact.
    async fn ensure_group(&self, chat_id: i64) -> Result<GroupSettings>;
    async fn update_group(&self, settings: &GroupSettings) -> Result<()>;
    async fn groups_with(&self, feature: GroupFeature) -> Result<Vec<GroupSettings>>;

    // -- Global events ---------------------------------------------------

    async fn insert_event(&self, event: &GlobalEvent) -> Result<()>;
    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<GlobalEvent>>;
}
