//! Shared types for the RASID bot engine.
//!
//! These types form the data model used across all modules: tracked
//! opportunities, the duplicate-content registry, per-group settings,
//! and global market events. They are designed to be stable so that
//! content, tracker, and engine modules can depend on them without
//! circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// Lifecycle status of a tracked opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpportunityStatus {
    /// Still progressing through its targets.
    Active,
    /// All targets achieved; terminal.
    Completed,
    /// Manually closed before completion; terminal, reachable from Active only.
    Closed,
}

impl fmt::Display for OpportunityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpportunityStatus::Active => write!(f, "active"),
            OpportunityStatus::Completed => write!(f, "completed"),
            OpportunityStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for OpportunityStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OpportunityStatus::Active),
            "completed" => Ok(OpportunityStatus::Completed),
            "closed" => Ok(OpportunityStatus::Closed),
            _ => Err(anyhow::anyhow!("Unknown opportunity status: {s}")),
        }
    }
}

/// One achieved price target, appended to the opportunity's log when the
/// market price meets or exceeds the target level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievedTarget {
    /// 1-based target index.
    pub target_no: u32,
    /// The market price that satisfied the target.
    pub price: Decimal,
    pub at: DateTime<Utc>,
}

/// A tracked trade idea: an entry price and an ordered ladder of price
/// targets the symbol must reach, in order, for the opportunity to advance.
///
/// Invariants (enforced by the tracker, persisted as-is):
/// - `achieved_targets.len() == current_target - 1`
/// - `current_target` never decreases
/// - `status == Completed` exactly when `current_target > targets.len()`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: Uuid,
    /// Tadawul symbol, e.g. "2222".
    pub symbol: String,
    /// Detection strategy that produced this opportunity.
    pub strategy: String,
    pub entry_price: Decimal,
    /// Ordered target prices; index 0 is target 1.
    pub targets: Vec<Decimal>,
    /// 1-based index of the next unmet target. `targets.len() + 1` once done.
    pub current_target: u32,
    pub status: OpportunityStatus,
    /// Append-only achievement log.
    pub achieved_targets: Vec<AchievedTarget>,
    pub created_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn new(symbol: &str, strategy: &str, entry_price: Decimal, targets: Vec<Decimal>) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            strategy: strategy.to_string(),
            entry_price,
            targets,
            current_target: 1,
            status: OpportunityStatus::Active,
            achieved_targets: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Price of the next unmet target, or None once all targets are achieved.
    pub fn next_target_price(&self) -> Option<Decimal> {
        self.targets.get(self.current_target as usize - 1).copied()
    }

    pub fn is_active(&self) -> bool {
        self.status == OpportunityStatus::Active
    }
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} entry {} target {}/{} ({})",
            self.strategy,
            self.symbol,
            self.entry_price,
            self.current_target.min(self.targets.len() as u32),
            self.targets.len(),
            self.status,
        )
    }
}

// ---------------------------------------------------------------------------
// Content registry
// ---------------------------------------------------------------------------

/// A row in the duplicate-suppression ledger, keyed by content fingerprint.
///
/// Entries are never deleted; the suppression window is evaluated against
/// `last_sent` at verdict time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEntry {
    /// SHA-256 hex of the normalized content text.
    pub fingerprint: String,
    /// Free-form tag: "stock_analysis", "daily_summary", a classifier
    /// category name, etc.
    pub content_type: String,
    pub first_sent: DateTime<Utc>,
    pub last_sent: DateTime<Utc>,
    pub sent_count: u32,
    /// Chats this content has been delivered to.
    pub related_groups: Vec<i64>,
}

impl ContentEntry {
    /// New ledger entry for a first send.
    pub fn new(fingerprint: &str, content_type: &str, chat_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            content_type: content_type.to_string(),
            first_sent: now,
            last_sent: now,
            sent_count: 1,
            related_groups: vec![chat_id],
        }
    }

    /// Record a permitted resend: bump the counter, refresh `last_sent`,
    /// and remember the recipient.
    pub fn note_resend(&mut self, chat_id: i64, now: DateTime<Utc>) {
        self.sent_count += 1;
        self.last_sent = now;
        if !self.related_groups.contains(&chat_id) {
            self.related_groups.push(chat_id);
        }
    }
}

// ---------------------------------------------------------------------------
// Content category
// ---------------------------------------------------------------------------

/// Classification buckets for free-text group messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentCategory {
    TechnicalAnalysis,
    FundamentalNews,
    MarketSentiment,
    GlobalEvent,
    Other,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentCategory::TechnicalAnalysis => write!(f, "technical_analysis"),
            ContentCategory::FundamentalNews => write!(f, "fundamental_news"),
            ContentCategory::MarketSentiment => write!(f, "market_sentiment"),
            ContentCategory::GlobalEvent => write!(f, "global_event"),
            ContentCategory::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for ContentCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technical_analysis" => Ok(ContentCategory::TechnicalAnalysis),
            "fundamental_news" => Ok(ContentCategory::FundamentalNews),
            "market_sentiment" => Ok(ContentCategory::MarketSentiment),
            "global_event" => Ok(ContentCategory::GlobalEvent),
            "other" => Ok(ContentCategory::Other),
            _ => Err(anyhow::anyhow!("Unknown content category: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Group settings
// ---------------------------------------------------------------------------

/// Broadcast feature a group can opt in or out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFeature {
    DailySummary,
    StockAnalysis,
    GlobalEvents,
    ContentScrubbing,
}

/// Per-chat feature toggles. Created lazily on first interaction with a
/// chat; every toggle defaults to enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSettings {
    pub chat_id: i64,
    pub daily_summary: bool,
    pub stock_analysis: bool,
    pub global_events: bool,
    pub content_scrubbing: bool,
    pub last_active: DateTime<Utc>,
}

impl GroupSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            daily_summary: true,
            stock_analysis: true,
            global_events: true,
            content_scrubbing: true,
            last_active: Utc::now(),
        }
    }

    pub fn has(&self, feature: GroupFeature) -> bool {
        match feature {
            GroupFeature::DailySummary => self.daily_summary,
            GroupFeature::StockAnalysis => self.stock_analysis,
            GroupFeature::GlobalEvents => self.global_events,
            GroupFeature::ContentScrubbing => self.content_scrubbing,
        }
    }

    /// Apply a named toggle from a `/settings` command.
    /// Returns false for an unknown toggle name.
    pub fn apply_toggle(&mut self, name: &str, on: bool) -> bool {
        match name {
            "daily_summary" => self.daily_summary = on,
            "stock_analysis" => self.stock_analysis = on,
            "global_events" => self.global_events = on,
            "content_scrubbing" => self.content_scrubbing = on,
            _ => return false,
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Global events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSeverity::Low => write!(f, "low"),
            EventSeverity::Medium => write!(f, "medium"),
            EventSeverity::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for EventSeverity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(EventSeverity::Low),
            "medium" => Ok(EventSeverity::Medium),
            "high" => Ok(EventSeverity::High),
            _ => Err(anyhow::anyhow!("Unknown event severity: {s}")),
        }
    }
}

/// A market-moving global event awaiting broadcast to opted-in groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalEvent {
    pub id: Uuid,
    pub description: String,
    pub severity: EventSeverity,
    pub detected_at: DateTime<Utc>,
}

impl GlobalEvent {
    pub fn new(description: &str, severity: EventSeverity) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.to_string(),
            severity,
            detected_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// A point-in-time quote for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: Decimal,
    /// Day change in percent.
    pub change_pct: Decimal,
    pub as_of: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Runtime counters
// ---------------------------------------------------------------------------

/// In-memory run statistics, logged on shutdown.
#[derive(Debug, Clone, Default)]
pub struct BotCounters {
    pub scan_cycles: u64,
    pub messages_handled: u64,
    pub analyses_sent: u64,
    pub duplicates_suppressed: u64,
    pub messages_scrubbed: u64,
    pub goals_reached: u64,
    pub broadcasts_sent: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
