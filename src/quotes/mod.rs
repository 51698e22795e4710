//! Price-quote collaborators.
//!
//! Defines the `QuoteSource` trait and the Tadawul HTTP implementation.
//! Quote failures are transient by definition: the caller logs and skips
//! the symbol for that cycle, with no retry bookkeeping.

pub mod tadawul;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::StockQuote;

/// Abstraction over market price feeds.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Current quote for a symbol.
    async fn current_price(&self, symbol: &str) -> Result<StockQuote>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}
