//! In-memory `QuoteSource` for integration testing.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use rasid::quotes::QuoteSource;
use rasid::types::StockQuote;

#[derive(Default)]
pub struct MockQuotes {
    prices: Mutex<HashMap<String, Decimal>>,
    /// If set, all operations will return this error.
    force_error: Mutex<Option<String>>,
}

impl MockQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn current_price(&self, symbol: &str) -> Result<StockQuote> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        let price = self
            .prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("No quote for symbol: {symbol}"))?;
        Ok(StockQuote {
            symbol: symbol.to_string(),
            price,
            change_pct: Decimal::ZERO,
            as_of: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "mock-quotes"
    }
}
