//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (bot token, quote API key) are referenced by env-var name in
//! the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub market: MarketConfig,
    pub quotes: QuotesConfig,
    pub duplication: DuplicationRules,
    pub strategy: StrategyConfig,
    pub storage: StorageConfig,
    /// Ordered classifier rules; scanned first-to-last, first match wins.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRule>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub name: String,
    /// Env var holding the Telegram bot token.
    pub token_env: String,
    /// User ids allowed to change group settings.
    #[serde(default)]
    pub admin_ids: Vec<i64>,
    /// Long-poll timeout for getUpdates.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    /// Valid Tadawul symbol range (inclusive).
    pub symbol_min: u32,
    pub symbol_max: u32,
    /// Riyadh is UTC+3 year-round; kept configurable to avoid a tz database.
    pub utc_offset_hours: i32,
    pub daily_summary_hour: u32,
    pub daily_summary_minute: u32,
    /// Opportunity price-scan interval.
    pub scan_interval_secs: u64,
    /// Global-event broadcast interval.
    pub events_interval_hours: u64,
    /// Registry sweep interval.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuotesConfig {
    pub base_url: String,
    pub api_key_env: Option<String>,
}

/// Duplicate-suppression policy.
///
/// `similarity_threshold` is accepted for config compatibility but the
/// checker never reads it; the repeat counter is the authoritative policy.
#[derive(Debug, Deserialize, Clone)]
pub struct DuplicationRules {
    pub window_hours: i64,
    pub allowed_repeats: u32,
    #[serde(default)]
    pub similarity_threshold: Option<f64>,
}

impl DuplicationRules {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.window_hours)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    /// Strategy tag stamped onto opportunities this instance creates.
    pub name: String,
    /// Successor target offsets, percent above the original entry price.
    pub successor_offsets_pct: Vec<f64>,
}

impl StrategyConfig {
    /// Offsets as decimals, dropping anything that is not a finite number.
    pub fn successor_offsets(&self) -> Vec<Decimal> {
        self.successor_offsets_pct
            .iter()
            .filter_map(|p| Decimal::from_f64_retain(*p))
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// sqlx connection string, e.g. "sqlite://rasid.db?mode=rwc".
    pub database_url: String,
}

/// One ordered classifier rule: first keyword hit assigns the category.
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

fn default_poll_timeout() -> u64 {
    5
}

/// Default classifier rules. Order matters: it is the scan order.
fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            name: "technical_analysis".into(),
            keywords: vec!["دعم".into(), "مقاومة".into(), "اتجاه".into()],
        },
        CategoryRule {
            name: "fundamental_news".into(),
            keywords: vec!["أرباح".into(), "توزيعات".into(), "اندماج".into()],
        },
        CategoryRule {
            name: "market_sentiment".into(),
            keywords: vec!["تفاؤل".into(), "تشاؤم".into(), "حيادية".into()],
        },
        CategoryRule {
            name: "global_event".into(),
            keywords: vec![
                "أسواق عالمية".into(),
                "الفيدرالي".into(),
                "النفط".into(),
                "حدث عالمي".into(),
            ],
        },
    ]
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
