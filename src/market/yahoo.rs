//! Yahoo-style upstream: per-symbol chart endpoint with a flat
//! `meta.regularMarketPrice` shape. No batching support, so codes are
//! fetched one by one and individual failures are skipped.

use crate::market::MarketDataProvider;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const QUOTE_TIMEOUT: Duration = Duration::from_secs(15);

pub struct YahooProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(YahooProvider {
            base_url: base_url.to_string(),
            client: reqwest::Client::builder()
                .user_agent("navsync/1.0")
                .build()?,
        })
    }

    async fn fetch_one(&self, symbol: &str) -> Result<f64> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=1d",
            self.base_url, symbol
        );
        debug!("Requesting price data from {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(QUOTE_TIMEOUT)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let data = response.json::<ChartResponse>().await?;
        let item = data
            .chart
            .result
            .first()
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;
        Ok(item.meta.regular_market_price)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Vec<ChartItem>,
}

#[derive(Debug, Deserialize)]
struct ChartItem {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn fetch_quotes(&self, codes: &[String]) -> HashMap<String, f64> {
        let mut prices = HashMap::new();
        for code in codes {
            match self.fetch_one(code).await {
                Ok(price) => {
                    prices.insert(code.clone(), price);
                }
                Err(e) => warn!(code = %code, "quote fetch failed: {e:#}"),
            }
        }
        prices
    }

    async fn fetch_fx(&self, pairs: &[String]) -> HashMap<String, f64> {
        let mut rates = HashMap::new();
        for pair in pairs {
            // Gateway pair names keep their exchange suffix; the chart
            // endpoint spells the same pair as {BASE}{QUOTE}=X.
            let code = pair.split('.').next().unwrap_or(pair);
            let symbol = format!("{code}=X");
            match self.fetch_one(&symbol).await {
                Ok(rate) => {
                    rates.insert(pair.clone(), rate);
                }
                Err(e) => warn!(pair = %pair, "FX fetch failed: {e:#}"),
            }
        }
        rates
    }
}
