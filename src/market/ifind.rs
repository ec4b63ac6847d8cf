//! iFinD-style upstream: token-authenticated, batched realtime quotation
//! endpoint returning a table of value series per code.

use crate::market::MarketDataProvider;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);
const QUOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Access-token state for the run. The acquisition call happens at most once:
/// a failed acquisition is remembered and every later call degrades to an
/// empty result instead of retrying.
enum TokenState {
    Unresolved,
    Failed,
    Ready(String),
}

pub struct IfindProvider {
    base_url: String,
    refresh_token: Option<String>,
    client: reqwest::Client,
    token: Mutex<TokenState>,
}

impl IfindProvider {
    pub fn new(base_url: &str, refresh_token: Option<String>) -> Result<Self> {
        Ok(IfindProvider {
            base_url: base_url.to_string(),
            refresh_token,
            client: reqwest::Client::builder()
                .user_agent("navsync/1.0")
                .build()?,
            token: Mutex::new(TokenState::Unresolved),
        })
    }

    async fn access_token(&self) -> Option<String> {
        let mut state = self.token.lock().await;
        match &*state {
            TokenState::Ready(token) => return Some(token.clone()),
            TokenState::Failed => return None,
            TokenState::Unresolved => {}
        }

        let Some(refresh_token) = self.refresh_token.as_deref() else {
            warn!("IFIND_REFRESH_TOKEN not set; market data disabled");
            *state = TokenState::Failed;
            return None;
        };

        match self.acquire_token(refresh_token).await {
            Ok(token) => {
                debug!("acquired access token");
                *state = TokenState::Ready(token.clone());
                Some(token)
            }
            Err(e) => {
                warn!("access token acquisition failed: {e:#}");
                *state = TokenState::Failed;
                None
            }
        }
    }

    async fn acquire_token(&self, refresh_token: &str) -> Result<String> {
        let url = format!("{}/api/v1/get_access_token", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("refresh_token", refresh_token)
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .context("token request failed")?
            .error_for_status()
            .context("token endpoint returned an error status")?;

        let body: TokenResponse = response
            .json()
            .await
            .context("token response was not valid JSON")?;
        if body.errorcode != 0 {
            bail!(
                "token endpoint returned error {}: {}",
                body.errorcode,
                body.message.unwrap_or_default()
            );
        }
        body.data
            .map(|d| d.access_token)
            .ok_or_else(|| anyhow!("token response missing data"))
    }

    /// One batched realtime call for all codes; the authoritative latest
    /// price is the last element of each code's `latest` series.
    async fn fetch_latest(&self, codes: &[String]) -> Result<HashMap<String, f64>> {
        let Some(token) = self.access_token().await else {
            return Ok(HashMap::new());
        };

        let url = format!("{}/api/v1/real_time_quotation", self.base_url);
        let payload = json!({
            "codes": codes.join(","),
            "indicators": "latest",
        });
        debug!(count = codes.len(), "requesting realtime quotations");

        let response = self
            .client
            .post(&url)
            .header("access_token", token)
            .json(&payload)
            .timeout(QUOTE_TIMEOUT)
            .send()
            .await
            .context("realtime quotation request failed")?
            .error_for_status()
            .context("realtime quotation endpoint returned an error status")?;

        let body: QuotationResponse = response
            .json()
            .await
            .context("realtime quotation response was not valid JSON")?;
        if body.errorcode != 0 {
            bail!(
                "realtime quotation returned error {}: {}",
                body.errorcode,
                body.message.unwrap_or_default()
            );
        }

        let mut prices = HashMap::new();
        for item in body.tables {
            if item.thscode.is_empty() {
                continue;
            }
            let Some(raw) = item.table.latest.last() else {
                continue;
            };
            match coerce_price(raw) {
                Some(price) => {
                    prices.insert(item.thscode, price);
                }
                None => {
                    // One bad value must not abort the batch
                    warn!(code = %item.thscode, value = %raw, "unparseable latest price; skipping");
                }
            }
        }
        Ok(prices)
    }
}

/// Series values arrive either as JSON numbers or numeric strings.
fn coerce_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    errorcode: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<TokenData>,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct QuotationResponse {
    errorcode: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    tables: Vec<QuoteTable>,
}

#[derive(Debug, Deserialize)]
struct QuoteTable {
    #[serde(default)]
    thscode: String,
    #[serde(default)]
    table: SeriesTable,
}

#[derive(Debug, Default, Deserialize)]
struct SeriesTable {
    #[serde(default)]
    latest: Vec<Value>,
}

#[async_trait]
impl MarketDataProvider for IfindProvider {
    async fn fetch_quotes(&self, codes: &[String]) -> HashMap<String, f64> {
        if codes.is_empty() {
            return HashMap::new();
        }
        match self.fetch_latest(codes).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!("quote fetch failed: {e:#}");
                HashMap::new()
            }
        }
    }

    async fn fetch_fx(&self, pairs: &[String]) -> HashMap<String, f64> {
        if pairs.is_empty() {
            return HashMap::new();
        }
        // FX pairs go through the same realtime endpoint as instruments.
        match self.fetch_latest(pairs).await {
            Ok(rates) => rates,
            Err(e) => {
                warn!("FX fetch failed: {e:#}");
                HashMap::new()
            }
        }
    }
}
