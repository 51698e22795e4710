//! Outbound message templates.
//!
//! All user-facing text lives here, in Arabic, formatted for Telegram
//! Markdown. The engine composes behavior; this module only renders.

use crate::types::{EventSeverity, GlobalEvent, GroupSettings, Opportunity, StockQuote};
use crate::tracker::TrackerEvent;

/// `/start` reply.
pub fn welcome() -> String {
    "📈 *مرحبًا بكم في بوت الأسهم السعودية الذكي*\n\n\
     استخدم الأوامر التالية:\n\
     - /settings : ضبط إعدادات المجموعة\n\
     - رمز السهم (مثل: 2222) : الحصول على التحليل الفني"
        .to_string()
}

fn toggle_mark(on: bool) -> &'static str {
    if on {
        "✅"
    } else {
        "❌"
    }
}

/// `/settings` reply: current toggles plus usage hint.
pub fn settings_menu(settings: &GroupSettings) -> String {
    format!(
        "⚙️ *إعدادات البوت*\n\n\
         {} التقرير اليومي (daily_summary)\n\
         {} تحليل الأسهم (stock_analysis)\n\
         {} الأحداث العالمية (global_events)\n\
         {} تنقية المحتوى (content_scrubbing)\n\n\
         للتغيير: `/settings <الاسم> on|off`",
        toggle_mark(settings.daily_summary),
        toggle_mark(settings.stock_analysis),
        toggle_mark(settings.global_events),
        toggle_mark(settings.content_scrubbing),
    )
}

/// Per-symbol analysis card.
pub fn analysis_card(quote: &StockQuote) -> String {
    format!(
        "📊 *تحليل سهم {}*\n\n\
         السعر الحالي: {} ريال\n\
         التغيير: {}%",
        quote.symbol, quote.price, quote.change_pct,
    )
}

/// Sent instead of a fresh card when the same symbol was just analyzed.
pub fn duplicate_notice() -> String {
    "⏳ هذا السهم قيد التحليل بالفعل".to_string()
}

/// Generic failure reply; details stay in the logs.
pub fn error_notice() -> String {
    "⚠️ حدث خطأ في معالجة الطلب".to_string()
}

/// Reply to a non-admin attempting a settings change.
pub fn admin_only() -> String {
    "🔒 تغيير الإعدادات متاح للمشرفين فقط".to_string()
}

/// Warning posted after a message is deleted by the scrubber.
pub fn scrub_warning() -> String {
    "🚫 *تنبيه*: تم حذف الرسالة لاحتوائها على محتوى غير مسموح به \
     (أرقام جوال أو روابط أو إعلانات)"
        .to_string()
}

/// Render one tracker event as a group notification.
/// `SuccessorCreated` gets its own announcement.
pub fn tracker_alert(event: &TrackerEvent) -> String {
    match event {
        TrackerEvent::TargetReached {
            symbol,
            target_no,
            target_price,
            price,
            ..
        } => format!(
            "🎯 *تحقق الهدف {target_no} لسهم {symbol}*\n\n\
             سعر الهدف: {target_price} ريال\n\
             سعر السوق: {price} ريال",
        ),
        TrackerEvent::Completed { symbol, .. } => {
            format!("✅ *اكتملت فرصة سهم {symbol}* — تحققت جميع الأهداف")
        }
        TrackerEvent::SuccessorCreated { successor } => successor_announcement(successor),
    }
}

/// New-opportunity card, used for successors seeded after completion.
pub fn successor_announcement(opp: &Opportunity) -> String {
    let targets = opp
        .targets
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {t} ريال", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "🔄 *فرصة جديدة لسهم {}*\n\n\
         سعر الدخول: {} ريال\n\
         الأهداف:\n{targets}",
        opp.symbol, opp.entry_price,
    )
}

/// Daily market summary listing opportunities still in play.
pub fn daily_report(active: &[Opportunity]) -> String {
    let mut lines = vec!["📨 *التقرير اليومي للسوق*".to_string(), String::new()];
    if active.is_empty() {
        lines.push("لا توجد فرص نشطة حاليًا".to_string());
    } else {
        lines.push(format!("الفرص النشطة: {}", active.len()));
        for opp in active {
            lines.push(format!(
                "• سهم {} — الهدف {}/{}",
                opp.symbol,
                opp.current_target.min(opp.targets.len() as u32),
                opp.targets.len(),
            ));
        }
    }
    lines.join("\n")
}

fn severity_label(severity: EventSeverity) -> &'static str {
    match severity {
        EventSeverity::Low => "منخفض",
        EventSeverity::Medium => "متوسط",
        EventSeverity::High => "مرتفع",
    }
}

/// Global-event broadcast.
pub fn event_broadcast(event: &GlobalEvent) -> String {
    format!(
        "🌍 *حدث عالمي مؤثر*\n\n{}\n\nالمستوى: {}",
        event.description,
        severity_label(event.severity),
    )
}
