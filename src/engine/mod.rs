//! Core engine — inbound routing, goal monitoring, and broadcasts.
//!
//! The three parts share no state beyond the `Store`; the binary drives
//! them from a single select loop, so cycles never overlap.

pub mod broadcaster;
pub mod monitor;
pub mod router;

pub use broadcaster::Broadcaster;
pub use monitor::{CycleReport, GoalMonitor};
pub use router::MessageRouter;
