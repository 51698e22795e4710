//! RASID — Saudi stock-market Telegram bot engine.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod content;
pub mod tracker;
pub mod quotes;
pub mod telegram;
pub mod storage;
pub mod reports;
pub mod engine;
