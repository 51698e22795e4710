//! RASID — Saudi stock-market Telegram bot engine.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens storage, and runs the poll/scan/broadcast loop with graceful
//! shutdown.

use anyhow::Result;
use chrono::{FixedOffset, NaiveDate, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use rasid::config::AppConfig;
use rasid::engine::{Broadcaster, GoalMonitor, MessageRouter};
use rasid::quotes::tadawul::TadawulClient;
use rasid::quotes::QuoteSource;
use rasid::storage::sqlite::SqliteStore;
use rasid::storage::Store;
use rasid::telegram::bot_api::TelegramClient;
use rasid::telegram::ChatGateway;
use rasid::tracker::{GoalTracker, TrackerConfig};
use rasid::types::BotCounters;

const BANNER: &str = r#"
 ____      _    ____ ___ ____
|  _ \    / \  / ___|_ _|  _ \
| |_) |  / _ \ \___ \| || | | |
|  _ <  / ___ \ ___) | || |_| |
|_| \_\/_/   \_\____/___|____/

  Saudi Stock Market Bot Engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;
    init_logging();

    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        scan_interval_secs = cfg.market.scan_interval_secs,
        strategy = %cfg.strategy.name,
        "RASID starting up"
    );

    // -- Initialise components -------------------------------------------

    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&cfg.storage.database_url).await?);

    let token = AppConfig::resolve_env(&cfg.bot.token_env)?;
    let gateway: Arc<dyn ChatGateway> =
        Arc::new(TelegramClient::new(token, cfg.bot.poll_timeout_secs)?);

    let quote_api_key = cfg
        .quotes
        .api_key_env
        .as_deref()
        .and_then(|env| std::env::var(env).ok());
    if quote_api_key.is_none() {
        warn!("No quote API key configured — relying on the public feed");
    }
    let quotes: Arc<dyn QuoteSource> =
        Arc::new(TadawulClient::new(&cfg.quotes.base_url, quote_api_key)?);

    let router = MessageRouter::new(&cfg, store.clone(), gateway.clone(), quotes.clone())?;
    let monitor = GoalMonitor::new(
        store.clone(),
        gateway.clone(),
        quotes.clone(),
        GoalTracker::new(TrackerConfig {
            successor_offsets_pct: cfg.strategy.successor_offsets(),
        }),
    );
    let broadcaster = Broadcaster::new(store.clone(), gateway.clone(), cfg.duplication.clone());

    // -- Main loop -------------------------------------------------------

    let mut scan_tick = tokio::time::interval(Duration::from_secs(cfg.market.scan_interval_secs));
    let mut events_tick =
        tokio::time::interval(Duration::from_secs(cfg.market.events_interval_hours * 3600));
    let mut sweep_tick = tokio::time::interval(Duration::from_secs(cfg.market.sweep_interval_secs));
    // The summary fires on local wall-clock time, checked once a minute.
    let mut summary_tick = tokio::time::interval(Duration::from_secs(60));
    // First tick of a tokio interval is immediate; skip the cold-start runs.
    scan_tick.tick().await;
    events_tick.tick().await;
    sweep_tick.tick().await;

    let market_offset = FixedOffset::east_opt(cfg.market.utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let mut last_summary_date: Option<NaiveDate> = None;

    let mut counters = BotCounters::default();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(gateway = gateway.name(), quotes = quotes.name(), "Entering main loop");

    loop {
        tokio::select! {
            inbound = gateway.poll_updates() => {
                match inbound {
                    Ok(messages) => {
                        for msg in &messages {
                            if let Err(e) = router.handle(msg, &mut counters).await {
                                error!(chat_id = msg.chat_id, error = %e, "Message handling failed");
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Update poll failed — backing off");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
            _ = scan_tick.tick() => {
                if let Err(e) = monitor.scan_cycle(&mut counters).await {
                    error!(error = %e, "Scan cycle failed — continuing to next");
                }
            }
            _ = summary_tick.tick() => {
                let local = Utc::now().with_timezone(&market_offset);
                let due = (local.hour(), local.minute())
                    >= (cfg.market.daily_summary_hour, cfg.market.daily_summary_minute);
                if due && last_summary_date != Some(local.date_naive()) {
                    match broadcaster.daily_summary(&mut counters).await {
                        Ok(_) => last_summary_date = Some(local.date_naive()),
                        Err(e) => error!(error = %e, "Daily summary failed"),
                    }
                }
            }
            _ = events_tick.tick() => {
                if let Err(e) = broadcaster
                    .broadcast_events(broadcaster.events_horizon(), &mut counters)
                    .await
                {
                    error!(error = %e, "Event broadcast failed");
                }
            }
            _ = sweep_tick.tick() => {
                if let Err(e) = broadcaster.sweep_registry().await {
                    error!(error = %e, "Registry sweep failed");
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(
        cycles = counters.scan_cycles,
        messages = counters.messages_handled,
        analyses = counters.analyses_sent,
        suppressed = counters.duplicates_suppressed,
        scrubbed = counters.messages_scrubbed,
        goals = counters.goals_reached,
        broadcasts = counters.broadcasts_sent,
        "RASID shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rasid=info"));

    let json_logging = std::env::var("RASID_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
