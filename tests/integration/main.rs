//! End-to-end engine tests over in-memory mocks.
//!
//! Everything runs against `MockStore`, `MockGateway`, and `MockQuotes`,
//! so the full dispatch and cycle paths are exercised without a network
//! or a database file.

mod mock_gateway;
mod mock_quotes;
mod mock_store;

use std::sync::Arc;

use chrono::Duration;
use rust_decimal_macros::dec;

use rasid::config::AppConfig;
use rasid::content::fingerprint;
use rasid::engine::{Broadcaster, GoalMonitor, MessageRouter};
use rasid::storage::Store;
use rasid::telegram::InboundMessage;
use rasid::tracker::{GoalTracker, TrackerConfig};
use rasid::types::{
    BotCounters, EventSeverity, GlobalEvent, GroupSettings, Opportunity, OpportunityStatus,
};

use mock_gateway::MockGateway;
use mock_quotes::MockQuotes;
use mock_store::MockStore;

const TEST_CONFIG: &str = r#"
    [bot]
    name = "RASID-TEST"
    token_env = "TELEGRAM_BOT_TOKEN"
    admin_ids = [999]

    [market]
    symbol_min = 1000
    symbol_max = 9999
    utc_offset_hours = 3
    daily_summary_hour = 16
    daily_summary_minute = 30
    scan_interval_secs = 3600
    events_interval_hours = 2
    sweep_interval_secs = 1800

    [quotes]
    base_url = "http://localhost"

    [duplication]
    window_hours = 6
    allowed_repeats = 2

    [strategy]
    name = "breakout"
    successor_offsets_pct = [5.0, 8.0, 10.0]

    [storage]
    database_url = "sqlite::memory:"
"#;

// ---- helpers ---------------------------------------------------------------

struct Harness {
    store: Arc<MockStore>,
    gateway: Arc<MockGateway>,
    quotes: Arc<MockQuotes>,
    router: MessageRouter,
    monitor: GoalMonitor,
    broadcaster: Broadcaster,
}

fn harness() -> Harness {
    let cfg = AppConfig::parse(TEST_CONFIG).unwrap();
    let store = Arc::new(MockStore::new());
    let gateway = Arc::new(MockGateway::new());
    let quotes = Arc::new(MockQuotes::new());

    let router = MessageRouter::new(
        &cfg,
        store.clone(),
        gateway.clone(),
        quotes.clone(),
    )
    .unwrap();
    let monitor = GoalMonitor::new(
        store.clone(),
        gateway.clone(),
        quotes.clone(),
        GoalTracker::new(TrackerConfig {
            successor_offsets_pct: cfg.strategy.successor_offsets(),
        }),
    );
    let broadcaster = Broadcaster::new(store.clone(), gateway.clone(), cfg.duplication.clone());

    Harness {
        store,
        gateway,
        quotes,
        router,
        monitor,
        broadcaster,
    }
}

fn group_message(chat_id: i64, from_id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id,
        message_id: 1,
        from_id: Some(from_id),
        text: text.to_string(),
        is_group: true,
    }
}

// ---- goal monitor ----------------------------------------------------------

#[tokio::test]
async fn test_goal_lifecycle_end_to_end() {
    let h = harness();
    h.store.seed_group(GroupSettings::new(-100));

    let opp = Opportunity::new(
        "2222",
        "breakout",
        dec!(100),
        vec![dec!(105), dec!(108), dec!(110)],
    );
    let opp_id = opp.id;
    h.store.insert_opportunity(&opp).await.unwrap();

    let mut counters = BotCounters::default();

    // Below the first target: nothing happens.
    h.quotes.set_price("2222", dec!(104));
    let report = h.monitor.scan_cycle(&mut counters).await.unwrap();
    assert_eq!(report.targets_reached, 0);
    assert!(h.gateway.sent().is_empty());

    // First target hit: persisted and announced.
    h.quotes.set_price("2222", dec!(106));
    let report = h.monitor.scan_cycle(&mut counters).await.unwrap();
    assert_eq!(report.targets_reached, 1);
    let stored = h.store.get_opportunity(opp_id).await.unwrap().unwrap();
    assert_eq!(stored.current_target, 2);
    assert_eq!(stored.achieved_targets.len(), 1);
    let alerts = h.gateway.sent_to(-100);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("تحقق الهدف 1 لسهم 2222"));

    // Second target.
    h.quotes.set_price("2222", dec!(109));
    h.monitor.scan_cycle(&mut counters).await.unwrap();

    // Final target: completion plus a successor at +5/+8/+10% of entry.
    h.quotes.set_price("2222", dec!(111));
    let report = h.monitor.scan_cycle(&mut counters).await.unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(report.successors_created, 1);

    let all = h.store.all_opportunities();
    assert_eq!(all.len(), 2);
    let done = all.iter().find(|o| o.id == opp_id).unwrap();
    assert_eq!(done.status, OpportunityStatus::Completed);
    assert_eq!(done.achieved_targets.len(), 3);

    let successor = all.iter().find(|o| o.id != opp_id).unwrap();
    assert_eq!(successor.status, OpportunityStatus::Active);
    assert_eq!(successor.entry_price, dec!(100));
    assert_eq!(
        successor.targets,
        vec![dec!(105.00), dec!(108.00), dec!(110.00)]
    );

    assert_eq!(counters.goals_reached, 3);

    // Further prices never advance the completed opportunity, and the
    // successor advances independently.
    h.quotes.set_price("2222", dec!(120));
    h.monitor.scan_cycle(&mut counters).await.unwrap();
    let done = h.store.get_opportunity(opp_id).await.unwrap().unwrap();
    assert_eq!(done.achieved_targets.len(), 3);
}

#[tokio::test]
async fn test_successor_dropped_when_active_already_exists() {
    let h = harness();

    let opp = Opportunity::new("2222", "breakout", dec!(100), vec![dec!(105)]);
    h.store.insert_opportunity(&opp).await.unwrap();
    // A competing active opportunity for the same symbol and strategy.
    let competing = Opportunity::new("2222", "breakout", dec!(101), vec![dec!(200)]);
    h.store.insert_opportunity(&competing).await.unwrap();

    h.quotes.set_price("2222", dec!(106));
    let mut counters = BotCounters::default();
    let report = h.monitor.scan_cycle(&mut counters).await.unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(report.successors_created, 0);
    // Only the original two opportunities remain.
    assert_eq!(h.store.all_opportunities().len(), 2);
}

#[tokio::test]
async fn test_quote_failure_skips_opportunity() {
    let h = harness();
    let opp = Opportunity::new("2222", "breakout", dec!(100), vec![dec!(105)]);
    h.store.insert_opportunity(&opp).await.unwrap();
    h.quotes.set_error("feed down");

    let mut counters = BotCounters::default();
    let report = h.monitor.scan_cycle(&mut counters).await.unwrap();
    assert_eq!(report.errors, 1);
    assert_eq!(report.targets_reached, 0);

    let stored = h.store.get_opportunity(opp.id).await.unwrap().unwrap();
    assert_eq!(stored.current_target, 1);
    assert_eq!(stored.status, OpportunityStatus::Active);
}

// ---- router ----------------------------------------------------------------

#[tokio::test]
async fn test_start_command_replies_welcome() {
    let h = harness();
    let mut counters = BotCounters::default();
    h.router
        .handle(&group_message(-1, 5, "/start"), &mut counters)
        .await
        .unwrap();

    let sent = h.gateway.sent_to(-1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("مرحبًا بكم"));
    // First contact created the group row with defaults.
    assert!(h.store.group(-1).unwrap().daily_summary);
}

#[tokio::test]
async fn test_symbol_request_sends_analysis_and_registers() {
    let h = harness();
    h.quotes.set_price("2222", dec!(31.45));

    let mut counters = BotCounters::default();
    h.router
        .handle(&group_message(-1, 5, "2222"), &mut counters)
        .await
        .unwrap();

    let sent = h.gateway.sent_to(-1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("تحليل سهم 2222"));
    assert_eq!(counters.analyses_sent, 1);

    let entry = h.store.content_entry(&fingerprint("2222")).unwrap();
    assert_eq!(entry.sent_count, 1);
    assert_eq!(entry.content_type, "stock_analysis");
    assert_eq!(entry.related_groups, vec![-1]);
}

#[tokio::test]
async fn test_symbol_request_suppressed_at_repeat_ceiling() {
    let h = harness();
    h.quotes.set_price("2222", dec!(31.45));
    let mut counters = BotCounters::default();

    // allowed_repeats = 2: two sends go through, the third is suppressed.
    for _ in 0..3 {
        h.router
            .handle(&group_message(-1, 5, "2222"), &mut counters)
            .await
            .unwrap();
    }

    let sent = h.gateway.sent_to(-1);
    assert_eq!(sent.len(), 3);
    assert!(sent[0].contains("تحليل سهم 2222"));
    assert!(sent[1].contains("تحليل سهم 2222"));
    assert!(sent[2].contains("قيد التحليل بالفعل"));
    assert_eq!(counters.analyses_sent, 2);
    assert_eq!(counters.duplicates_suppressed, 1);

    let entry = h.store.content_entry(&fingerprint("2222")).unwrap();
    assert_eq!(entry.sent_count, 2);
}

#[tokio::test]
async fn test_quote_error_answers_with_notice() {
    let h = harness();
    h.quotes.set_error("feed down");

    let mut counters = BotCounters::default();
    h.router
        .handle(&group_message(-1, 5, "2222"), &mut counters)
        .await
        .unwrap();

    let sent = h.gateway.sent_to(-1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("حدث خطأ"));
    // A failed lookup is never recorded in the ledger.
    assert!(h.store.content_entry(&fingerprint("2222")).is_none());
}

#[tokio::test]
async fn test_scrubber_deletes_and_warns() {
    let h = harness();
    let mut counters = BotCounters::default();
    h.router
        .handle(
            &group_message(-1, 5, "انضموا لمجموعة واتساب 0501234567"),
            &mut counters,
        )
        .await
        .unwrap();

    assert_eq!(h.gateway.deleted(), vec![(-1, 1)]);
    let sent = h.gateway.sent_to(-1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("تم حذف الرسالة"));
    assert_eq!(counters.messages_scrubbed, 1);
}

#[tokio::test]
async fn test_scrubbing_respects_group_toggle() {
    let h = harness();
    let mut settings = GroupSettings::new(-1);
    settings.content_scrubbing = false;
    h.store.seed_group(settings);

    let mut counters = BotCounters::default();
    h.router
        .handle(&group_message(-1, 5, "رابط http://spam.example"), &mut counters)
        .await
        .unwrap();

    assert!(h.gateway.deleted().is_empty());
    assert_eq!(counters.messages_scrubbed, 0);
}

#[tokio::test]
async fn test_settings_toggle_is_admin_only() {
    let h = harness();
    let mut counters = BotCounters::default();

    // Non-admin denied.
    h.router
        .handle(
            &group_message(-1, 5, "/settings daily_summary off"),
            &mut counters,
        )
        .await
        .unwrap();
    assert!(h.store.group(-1).unwrap().daily_summary);
    assert!(h.gateway.sent_to(-1)[0].contains("للمشرفين فقط"));

    // Admin flips the toggle and gets the updated menu back.
    h.router
        .handle(
            &group_message(-1, 999, "/settings daily_summary off"),
            &mut counters,
        )
        .await
        .unwrap();
    assert!(!h.store.group(-1).unwrap().daily_summary);
    let sent = h.gateway.sent_to(-1);
    assert!(sent.last().unwrap().contains("إعدادات البوت"));
}

#[tokio::test]
async fn test_settings_without_args_shows_menu() {
    let h = harness();
    let mut counters = BotCounters::default();
    h.router
        .handle(&group_message(-1, 5, "/settings"), &mut counters)
        .await
        .unwrap();
    assert!(h.gateway.sent_to(-1)[0].contains("إعدادات البوت"));
}

#[tokio::test]
async fn test_global_event_text_is_recorded() {
    let h = harness();
    let mut counters = BotCounters::default();
    h.router
        .handle(
            &group_message(-1, 5, "ترقب في الأسواق العالمية بعد قرار الفيدرالي"),
            &mut counters,
        )
        .await
        .unwrap();

    let events = h.store.all_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].description.contains("الفيدرالي"));
    // Plain chatter records nothing.
    h.router
        .handle(&group_message(-1, 5, "صباح الخير"), &mut counters)
        .await
        .unwrap();
    assert_eq!(h.store.all_events().len(), 1);
}

// ---- broadcaster -----------------------------------------------------------

#[tokio::test]
async fn test_daily_summary_respects_group_toggle() {
    let h = harness();
    h.store.seed_group(GroupSettings::new(10));
    let mut off = GroupSettings::new(20);
    off.daily_summary = false;
    h.store.seed_group(off);

    let opp = Opportunity::new("2222", "breakout", dec!(100), vec![dec!(105)]);
    h.store.insert_opportunity(&opp).await.unwrap();

    let mut counters = BotCounters::default();
    let delivered = h.broadcaster.daily_summary(&mut counters).await.unwrap();
    assert_eq!(delivered, 1);

    let sent = h.gateway.sent_to(10);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("التقرير اليومي"));
    assert!(sent[0].contains("سهم 2222"));
    assert!(h.gateway.sent_to(20).is_empty());
    assert_eq!(counters.broadcasts_sent, 1);
}

#[tokio::test]
async fn test_event_broadcast_deduplicates_within_window() {
    let h = harness();
    h.store.seed_group(GroupSettings::new(10));
    h.store.seed_group(GroupSettings::new(20));

    let event = GlobalEvent::new("قرار الفيدرالي برفع الفائدة", EventSeverity::High);
    h.store.insert_event(&event).await.unwrap();
    let since = event.detected_at - Duration::hours(1);

    let mut counters = BotCounters::default();
    let delivered = h
        .broadcaster
        .broadcast_events(since, &mut counters)
        .await
        .unwrap();
    assert_eq!(delivered, 2);
    assert!(h.gateway.sent_to(10)[0].contains("حدث عالمي مؤثر"));

    // Two deliveries hit the repeat ceiling: the rerun sends nothing.
    let delivered = h
        .broadcaster
        .broadcast_events(since, &mut counters)
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    assert_eq!(counters.duplicates_suppressed, 1);
    assert_eq!(h.gateway.sent().len(), 2);
}

#[tokio::test]
async fn test_broadcast_survives_partial_send_failure() {
    let h = harness();
    h.store.seed_group(GroupSettings::new(10));

    let event = GlobalEvent::new("هبوط أسعار النفط", EventSeverity::Medium);
    h.store.insert_event(&event).await.unwrap();
    let since = event.detected_at - Duration::hours(1);

    h.gateway.set_error("telegram down");
    let mut counters = BotCounters::default();
    let delivered = h
        .broadcaster
        .broadcast_events(since, &mut counters)
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    // Nothing was delivered, so nothing was recorded in the ledger.
    assert_eq!(counters.broadcasts_sent, 0);

    // Once the gateway recovers the event still goes out.
    h.gateway.clear_error();
    let delivered = h
        .broadcaster
        .broadcast_events(since, &mut counters)
        .await
        .unwrap();
    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn test_registry_sweep_reports_stats() {
    let h = harness();
    h.quotes.set_price("2222", dec!(31.45));
    let mut counters = BotCounters::default();
    h.router
        .handle(&group_message(-1, 5, "2222"), &mut counters)
        .await
        .unwrap();

    let stats = h.broadcaster.sweep_registry().await.unwrap();
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.stale_entries, 0);
}
