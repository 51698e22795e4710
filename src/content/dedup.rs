//! Duplicate-content suppression.
//!
//! The verdict is a pure function over the ledger entry and the configured
//! rules; the caller owns the follow-up mutation (insert on `Fresh`, bump
//! counters on `Resend`). A fingerprint is suppressed only when it is both
//! inside the suppression window *and* already at the allowed-repeat
//! ceiling.
//!
//! The repeat counter is the authoritative policy. The config's
//! `similarity_threshold` knob is parsed for compatibility with older
//! deployments but never consulted here.

use chrono::{DateTime, Utc};

use crate::config::DuplicationRules;
use crate::types::ContentEntry;

/// Outcome of a duplicate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateVerdict {
    /// Never seen: caller inserts a new ledger entry.
    Fresh,
    /// Seen, but sending is permitted: caller bumps `sent_count` and
    /// `last_sent` via [`ContentEntry::note_resend`].
    Resend,
    /// Inside the window at the repeat ceiling: do not send.
    Suppressed,
}

/// Evaluate a fingerprint's registry entry against the suppression rules.
pub fn verdict(
    entry: Option<&ContentEntry>,
    now: DateTime<Utc>,
    rules: &DuplicationRules,
) -> DuplicateVerdict {
    let Some(entry) = entry else {
        return DuplicateVerdict::Fresh;
    };

    let elapsed = now - entry.last_sent;
    if elapsed < rules.window() && entry.sent_count >= rules.allowed_repeats {
        DuplicateVerdict::Suppressed
    } else {
        DuplicateVerdict::Resend
    }
}
