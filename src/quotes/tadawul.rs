//! Tadawul market-data client.
//!
//! Thin HTTP client over the exchange's market-data endpoint. Only the
//! fields the tracker needs are deserialized. The API key is optional:
//! some mirrors of the feed are public.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::QuoteSource;
use crate::types::StockQuote;

const SOURCE_NAME: &str = "tadawul";

/// Quote payload as served by the market-data endpoint.
#[derive(Debug, Deserialize)]
struct QuotePayload {
    symbol: String,
    last_price: Decimal,
    #[serde(default)]
    change_pct: Decimal,
}

pub struct TadawulClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TadawulClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("RASID/0.1.0 (saudi-stock-bot)")
            .build()
            .context("Failed to build HTTP client for Tadawul")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!("{}/market-data/{symbol}", self.base_url)
    }
}

#[async_trait]
impl QuoteSource for TadawulClient {
    async fn current_price(&self, symbol: &str) -> Result<StockQuote> {
        let url = self.quote_url(symbol);
        debug!(%url, "Fetching quote");

        let mut request = self.http.get(&url);
        if let Some(ref key) = self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Quote request failed for {symbol}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Quote endpoint returned {status} for {symbol}: {body}");
        }

        let payload: QuotePayload = response
            .json()
            .await
            .with_context(|| format!("Failed to parse quote for {symbol}"))?;

        Ok(StockQuote {
            symbol: payload.symbol,
            price: payload.last_price,
            change_pct: payload.change_pct,
            as_of: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
