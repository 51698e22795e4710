//! SQLite implementation of the `Store` trait via sqlx.
//!
//! Prices are stored as decimal strings, timestamps as RFC 3339 text,
//! and list-shaped fields (targets, achievement log, related groups) as
//! JSON text columns. The pool is capped at one connection so entity
//! mutations are serialized by construction.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use super::{RegistryStats, Store};
use crate::types::{
    AchievedTarget, ContentEntry, EventSeverity, GlobalEvent, GroupFeature, GroupSettings,
    Opportunity, OpportunityStatus,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS opportunities (
    id               TEXT PRIMARY KEY,
    symbol           TEXT NOT NULL,
    strategy         TEXT NOT NULL,
    entry_price      TEXT NOT NULL,
    targets          TEXT NOT NULL,
    current_target   INTEGER NOT NULL,
    status           TEXT NOT NULL,
    achieved_targets TEXT NOT NULL,
    created_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_opportunities_lookup
    ON opportunities (symbol, strategy, status);

CREATE TABLE IF NOT EXISTS content_registry (
    fingerprint    TEXT PRIMARY KEY,
    content_type   TEXT NOT NULL,
    first_sent     TEXT NOT NULL,
    last_sent      TEXT NOT NULL,
    sent_count     INTEGER NOT NULL,
    related_groups TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS group_settings (
    chat_id           INTEGER PRIMARY KEY,
    daily_summary     INTEGER NOT NULL,
    stock_analysis    INTEGER NOT NULL,
    global_events     INTEGER NOT NULL,
    content_scrubbing INTEGER NOT NULL,
    last_active       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS global_events (
    id          TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    severity    TEXT NOT NULL,
    detected_at TEXT NOT NULL
);
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and run schema migration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to open database: {database_url}"))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("Failed to initialise database schema")?;

        info!(database_url, "SQLite store ready");
        Ok(Self { pool })
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Bad timestamp in database: {s}"))?
        .with_timezone(&Utc))
}

fn decode_opportunity(row: &SqliteRow) -> Result<Opportunity> {
    let id: String = row.get("id");
    let entry_price: String = row.get("entry_price");
    let targets_json: String = row.get("targets");
    let status: String = row.get("status");
    let achieved_json: String = row.get("achieved_targets");
    let created_at: String = row.get("created_at");

    Ok(Opportunity {
        id: Uuid::parse_str(&id).context("Bad opportunity id in database")?,
        symbol: row.get("symbol"),
        strategy: row.get("strategy"),
        entry_price: Decimal::from_str(&entry_price).context("Bad entry price in database")?,
        targets: serde_json::from_str(&targets_json).context("Bad targets JSON in database")?,
        current_target: row.get::<i64, _>("current_target") as u32,
        status: OpportunityStatus::from_str(&status)?,
        achieved_targets: serde_json::from_str::<Vec<AchievedTarget>>(&achieved_json)
            .context("Bad achievement log JSON in database")?,
        created_at: parse_ts(&created_at)?,
    })
}

fn decode_content(row: &SqliteRow) -> Result<ContentEntry> {
    let first_sent: String = row.get("first_sent");
    let last_sent: String = row.get("last_sent");
    let groups_json: String = row.get("related_groups");

    Ok(ContentEntry {
        fingerprint: row.get("fingerprint"),
        content_type: row.get("content_type"),
        first_sent: parse_ts(&first_sent)?,
        last_sent: parse_ts(&last_sent)?,
        sent_count: row.get::<i64, _>("sent_count") as u32,
        related_groups: serde_json::from_str(&groups_json)
            .context("Bad related groups JSON in database")?,
    })
}

fn decode_group(row: &SqliteRow) -> Result<GroupSettings> {
    let last_active: String = row.get("last_active");
    Ok(GroupSettings {
        chat_id: row.get("chat_id"),
        daily_summary: row.get("daily_summary"),
        stock_analysis: row.get("stock_analysis"),
        global_events: row.get("global_events"),
        content_scrubbing: row.get("content_scrubbing"),
        last_active: parse_ts(&last_active)?,
    })
}

fn decode_event(row: &SqliteRow) -> Result<GlobalEvent> {
    let id: String = row.get("id");
    let severity: String = row.get("severity");
    let detected_at: String = row.get("detected_at");
    Ok(GlobalEvent {
        id: Uuid::parse_str(&id).context("Bad event id in database")?,
        description: row.get("description"),
        severity: EventSeverity::from_str(&severity)?,
        detected_at: parse_ts(&detected_at)?,
    })
}

fn feature_column(feature: GroupFeature) -> &'static str {
    match feature {
        GroupFeature::DailySummary => "daily_summary",
        GroupFeature::StockAnalysis => "stock_analysis",
        GroupFeature::GlobalEvents => "global_events",
        GroupFeature::ContentScrubbing => "content_scrubbing",
    }
}

// ---------------------------------------------------------------------------
// Store impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Store for SqliteStore {
    async fn insert_opportunity(&self, opp: &Opportunity) -> Result<()> {
        sqlx::query(
            "INSERT INTO opportunities \
             (id, symbol, strategy, entry_price, targets, current_target, status, \
              achieved_targets, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(opp.id.to_string())
        .bind(&opp.symbol)
        .bind(&opp.strategy)
        .bind(opp.entry_price.to_string())
        .bind(serde_json::to_string(&opp.targets)?)
        .bind(opp.current_target as i64)
        .bind(opp.status.to_string())
        .bind(serde_json::to_string(&opp.achieved_targets)?)
        .bind(opp.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert opportunity")?;
        Ok(())
    }

    async fn update_opportunity(&self, opp: &Opportunity) -> Result<()> {
        let result = sqlx::query(
            "UPDATE opportunities SET current_target = ?, status = ?, achieved_targets = ? \
             WHERE id = ?",
        )
        .bind(opp.current_target as i64)
        .bind(opp.status.to_string())
        .bind(serde_json::to_string(&opp.achieved_targets)?)
        .bind(opp.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update opportunity")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("Opportunity {} not found for update", opp.id);
        }
        Ok(())
    }

    async fn get_opportunity(&self, id: Uuid) -> Result<Option<Opportunity>> {
        let row = sqlx::query("SELECT * FROM opportunities WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch opportunity")?;
        row.as_ref().map(decode_opportunity).transpose()
    }

    async fn active_opportunities(&self) -> Result<Vec<Opportunity>> {
        let rows = sqlx::query(
            "SELECT * FROM opportunities WHERE status = 'active' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active opportunities")?;
        rows.iter().map(decode_opportunity).collect()
    }

    async fn find_active(&self, symbol: &str, strategy: &str) -> Result<Option<Opportunity>> {
        let row = sqlx::query(
            "SELECT * FROM opportunities \
             WHERE symbol = ? AND strategy = ? AND status = 'active' LIMIT 1",
        )
        .bind(symbol)
        .bind(strategy)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up active opportunity")?;
        row.as_ref().map(decode_opportunity).transpose()
    }

    async fn get_content(&self, fingerprint: &str) -> Result<Option<ContentEntry>> {
        let row = sqlx::query("SELECT * FROM content_registry WHERE fingerprint = ?")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch registry entry")?;
        row.as_ref().map(decode_content).transpose()
    }

    async fn upsert_content(&self, entry: &ContentEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO content_registry \
             (fingerprint, content_type, first_sent, last_sent, sent_count, related_groups) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(fingerprint) DO UPDATE SET \
               last_sent = excluded.last_sent, \
               sent_count = excluded.sent_count, \
               related_groups = excluded.related_groups",
        )
        .bind(&entry.fingerprint)
        .bind(&entry.content_type)
        .bind(entry.first_sent.to_rfc3339())
        .bind(entry.last_sent.to_rfc3339())
        .bind(entry.sent_count as i64)
        .bind(serde_json::to_string(&entry.related_groups)?)
        .execute(&self.pool)
        .await
        .context("Failed to upsert registry entry")?;
        Ok(())
    }

    async fn registry_stats(&self, stale_before: DateTime<Utc>) -> Result<RegistryStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
                    COALESCE(SUM(CASE WHEN last_sent < ? THEN 1 ELSE 0 END), 0) AS stale \
             FROM content_registry",
        )
        .bind(stale_before.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute registry stats")?;

        Ok(RegistryStats {
            total_entries: row.get::<i64, _>("total") as u64,
            stale_entries: row.get::<i64, _>("stale") as u64,
        })
    }

    async fn ensure_group(&self, chat_id: i64) -> Result<GroupSettings> {
        if let Some(row) = sqlx::query("SELECT * FROM group_settings WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch group settings")?
        {
            return decode_group(&row);
        }

        let settings = GroupSettings::new(chat_id);
        sqlx::query(
            "INSERT INTO group_settings \
             (chat_id, daily_summary, stock_analysis, global_events, content_scrubbing, \
              last_active) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(settings.chat_id)
        .bind(settings.daily_summary)
        .bind(settings.stock_analysis)
        .bind(settings.global_events)
        .bind(settings.content_scrubbing)
        .bind(settings.last_active.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to create group settings")?;

        info!(chat_id, "New group registered with default settings");
        Ok(settings)
    }

    async fn update_group(&self, settings: &GroupSettings) -> Result<()> {
        sqlx::query(
            "UPDATE group_settings SET daily_summary = ?, stock_analysis = ?, \
             global_events = ?, content_scrubbing = ?, last_active = ? WHERE chat_id = ?",
        )
        .bind(settings.daily_summary)
        .bind(settings.stock_analysis)
        .bind(settings.global_events)
        .bind(settings.content_scrubbing)
        .bind(settings.last_active.to_rfc3339())
        .bind(settings.chat_id)
        .execute(&self.pool)
        .await
        .context("Failed to update group settings")?;
        Ok(())
    }

    async fn groups_with(&self, feature: GroupFeature) -> Result<Vec<GroupSettings>> {
        let sql = format!(
            "SELECT * FROM group_settings WHERE {} = 1",
            feature_column(feature)
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch opted-in groups")?;
        rows.iter().map(decode_group).collect()
    }

    async fn insert_event(&self, event: &GlobalEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO global_events (id, description, severity, detected_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(&event.description)
        .bind(event.severity.to_string())
        .bind(event.detected_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert global event")?;
        Ok(())
    }

    async fn recent_events(&self, since: DateTime<Utc>) -> Result<Vec<GlobalEvent>> {
        let rows = sqlx::query(
            "SELECT * FROM global_events WHERE detected_at >= ? ORDER BY detected_at",
        )
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent events")?;
        rows.iter().map(decode_event).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
