//! Goal tracker — the opportunity/price-target state machine.
//!
//! An opportunity advances through its ordered targets as the market price
//! meets them: each hit appends an achievement record, bumps
//! `current_target`, and emits an event. Exhausting the ladder completes
//! the opportunity and seeds a successor from fixed percentage offsets of
//! the original entry price. Targets are consumed strictly in order, never
//! skipped, never re-evaluated.
//!
//! Mutations that would violate an invariant are rejected with a typed
//! error and leave the opportunity untouched, so callers can distinguish
//! integrity violations from transient collaborator failures.

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{AchievedTarget, Opportunity, OpportunityStatus};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Integrity violations. These reject the mutation; prior state is intact.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("opportunity {id} is {status}, expected active")]
    NotActive { id: Uuid, status: OpportunityStatus },

    #[error(
        "opportunity {id} target log is corrupt: {achieved} achieved but current target is {current}"
    )]
    CorruptTargetLog { id: Uuid, achieved: usize, current: u32 },

    #[error("opportunity {id} has no targets")]
    NoTargets { id: Uuid },

    #[error("symbol {symbol} already has an active {strategy} opportunity")]
    DuplicateActive { symbol: String, strategy: String },
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What happened during one price check. Emitted in occurrence order so
/// the engine can turn them into notifications and persistence calls.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A target level was met or exceeded.
    TargetReached {
        opportunity_id: Uuid,
        symbol: String,
        target_no: u32,
        target_price: Decimal,
        price: Decimal,
    },
    /// The final target was achieved; the opportunity is now terminal.
    Completed { opportunity_id: Uuid, symbol: String },
    /// A successor opportunity was seeded from the completed one.
    /// The engine is responsible for persisting it.
    SuccessorCreated { successor: Opportunity },
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Successor target offsets, percent above the original entry price.
    pub successor_offsets_pct: Vec<Decimal>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            successor_offsets_pct: vec![
                Decimal::from(5),
                Decimal::from(8),
                Decimal::from(10),
            ],
        }
    }
}

pub struct GoalTracker {
    cfg: TrackerConfig,
}

impl GoalTracker {
    pub fn new(cfg: TrackerConfig) -> Self {
        Self { cfg }
    }

    /// Run one price check against an opportunity.
    ///
    /// A single price may satisfy several consecutive targets; they are
    /// consumed in order within this one call. Returns the events that
    /// occurred (possibly none). Non-active opportunities are a no-op:
    /// once completed or closed, no further advancement ever happens.
    pub fn check(
        &self,
        opp: &mut Opportunity,
        price: Decimal,
    ) -> Result<Vec<TrackerEvent>, TrackerError> {
        if !opp.is_active() {
            debug!(id = %opp.id, status = %opp.status, "Skipping non-active opportunity");
            return Ok(Vec::new());
        }
        self.validate(opp)?;

        let mut events = Vec::new();

        while let Some(target_price) = opp.next_target_price() {
            if price < target_price {
                break;
            }

            let target_no = opp.current_target;
            opp.achieved_targets.push(AchievedTarget {
                target_no,
                price,
                at: Utc::now(),
            });
            opp.current_target += 1;

            info!(
                id = %opp.id,
                symbol = %opp.symbol,
                target = target_no,
                target_price = %target_price,
                price = %price,
                "Target reached"
            );
            events.push(TrackerEvent::TargetReached {
                opportunity_id: opp.id,
                symbol: opp.symbol.clone(),
                target_no,
                target_price,
                price,
            });
        }

        if opp.current_target as usize > opp.targets.len() {
            opp.status = OpportunityStatus::Completed;
            info!(id = %opp.id, symbol = %opp.symbol, "Opportunity completed");
            events.push(TrackerEvent::Completed {
                opportunity_id: opp.id,
                symbol: opp.symbol.clone(),
            });

            let successor = self.successor_of(opp);
            info!(
                id = %successor.id,
                symbol = %successor.symbol,
                targets = ?successor.targets,
                "Successor opportunity seeded"
            );
            events.push(TrackerEvent::SuccessorCreated { successor });
        }

        Ok(events)
    }

    /// Manual close. Legal from Active only; terminal afterwards.
    pub fn close(&self, opp: &mut Opportunity) -> Result<(), TrackerError> {
        if !opp.is_active() {
            warn!(id = %opp.id, status = %opp.status, "Rejected close of non-active opportunity");
            return Err(TrackerError::NotActive {
                id: opp.id,
                status: opp.status,
            });
        }
        opp.status = OpportunityStatus::Closed;
        info!(id = %opp.id, symbol = %opp.symbol, "Opportunity closed manually");
        Ok(())
    }

    /// Seed the successor of a completed opportunity: same symbol and
    /// strategy, entry carried over, targets at the configured percentage
    /// offsets above the *original* entry price.
    pub fn successor_of(&self, opp: &Opportunity) -> Opportunity {
        let targets = self
            .cfg
            .successor_offsets_pct
            .iter()
            .map(|pct| opp.entry_price * (Decimal::ONE + pct / Decimal::ONE_HUNDRED))
            .collect();
        Opportunity::new(&opp.symbol, &opp.strategy, opp.entry_price, targets)
    }

    /// Structural invariants checked before any mutation.
    fn validate(&self, opp: &Opportunity) -> Result<(), TrackerError> {
        if opp.targets.is_empty() {
            return Err(TrackerError::NoTargets { id: opp.id });
        }
        if opp.achieved_targets.len() as u32 + 1 != opp.current_target {
            return Err(TrackerError::CorruptTargetLog {
                id: opp.id,
                achieved: opp.achieved_targets.len(),
                current: opp.current_target,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
