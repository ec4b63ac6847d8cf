//! Notion-backed record store: cursor-paginated database query plus
//! merge-patch page updates with bounded retry.

use crate::core::record::{PositionRecord, PropertyPatch};
use crate::store::RecordStore;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

// Ledger property names.
pub const NAME_PROP: &str = "Name";
pub const SYMBOL_PROP: &str = "Symbol";
pub const SHARES_PROP: &str = "Shares";
pub const CURRENCY_PROP: &str = "Currency";
pub const LAST_PRICE_PROP: &str = "Last Price";
pub const USD_PRICE_PROP: &str = "USD Price";
pub const ASSETS_PROP: &str = "Assets $";
pub const RATIO_PROP: &str = "Ratio";
pub const HIGH_LINE_PROP: &str = "High Line";
pub const LOW_LINE_PROP: &str = "Low Line";

const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;
const UPDATE_ATTEMPTS: usize = 3;
const QUERY_TIMEOUT: Duration = Duration::from_secs(15);
const UPDATE_TIMEOUT: Duration = Duration::from_secs(20);

pub struct NotionStore {
    base_url: String,
    api_key: Option<String>,
    database_id: Option<String>,
    client: reqwest::Client,
}

impl NotionStore {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        database_id: Option<String>,
    ) -> Result<Self> {
        Ok(NotionStore {
            base_url: base_url.to_string(),
            api_key,
            database_id,
            client: reqwest::Client::builder()
                .user_agent("navsync/1.0")
                .build()?,
        })
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.api_key.as_deref(), self.database_id.as_deref()) {
            (Some(key), Some(db)) => Some((key, db)),
            _ => None,
        }
    }
}

fn parse_title(prop: Option<&Value>) -> String {
    plain_text(prop, "title").unwrap_or_default()
}

fn parse_rich_text(prop: Option<&Value>) -> Option<String> {
    plain_text(prop, "rich_text").filter(|s| !s.is_empty())
}

/// Title and rich-text properties carry an array of text fragments;
/// the value is the concatenation of their plain text.
fn plain_text(prop: Option<&Value>, key: &str) -> Option<String> {
    let fragments = prop?.get(key)?.as_array()?;
    Some(
        fragments
            .iter()
            .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
            .collect::<String>(),
    )
}

fn parse_number(prop: Option<&Value>) -> Option<f64> {
    prop?.get("number")?.as_f64()
}

fn record_from_page(page: &Value) -> Option<PositionRecord> {
    let id = page.get("id")?.as_str()?.to_string();
    let props = page.get("properties")?;

    let name = parse_title(props.get(NAME_PROP)).trim().to_string();
    let mut record = PositionRecord::new(id, name);
    record.display_symbol = parse_rich_text(props.get(SYMBOL_PROP));
    record.shares = parse_number(props.get(SHARES_PROP)).unwrap_or(0.0);
    record.current_assets = parse_number(props.get(ASSETS_PROP));
    record.current_ratio = parse_number(props.get(RATIO_PROP));
    record.high_line = parse_number(props.get(HIGH_LINE_PROP));
    record.low_line = parse_number(props.get(LOW_LINE_PROP));
    Some(record)
}

#[async_trait]
impl RecordStore for NotionStore {
    async fn query_records(&self) -> Result<Vec<PositionRecord>> {
        let Some((api_key, database_id)) = self.credentials() else {
            warn!("record store credentials not configured; ledger is empty");
            return Ok(Vec::new());
        };

        let url = format!("{}/v1/databases/{}/query", self.base_url, database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut payload = json!({ "page_size": PAGE_SIZE });
            if let Some(cursor) = &cursor {
                payload["start_cursor"] = json!(cursor);
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .header("Notion-Version", NOTION_VERSION)
                .json(&payload)
                .timeout(QUERY_TIMEOUT)
                .send()
                .await
                .context("ledger query request failed")?
                .error_for_status()
                .context("ledger query returned an error status")?;

            let body: Value = response
                .json()
                .await
                .context("ledger query response was not valid JSON")?;

            for page in body
                .get("results")
                .and_then(Value::as_array)
                .unwrap_or(&Vec::new())
            {
                match record_from_page(page) {
                    Some(record) => records.push(record),
                    None => warn!("skipping unparseable ledger row"),
                }
            }

            if body.get("has_more").and_then(Value::as_bool) == Some(true) {
                cursor = body
                    .get("next_cursor")
                    .and_then(Value::as_str)
                    .map(String::from);
                if cursor.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        debug!(count = records.len(), "ledger query complete");
        Ok(records)
    }

    async fn update_record(&self, id: &str, patch: &PropertyPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let Some((api_key, _)) = self.credentials() else {
            bail!("record store credentials not configured");
        };

        let url = format!("{}/v1/pages/{}", self.base_url, id);
        let payload = json!({ "properties": patch.encode() });

        // Immediate retry, no backoff; the orchestrator treats exhaustion as
        // a per-record skip.
        let mut attempt = 1;
        loop {
            let result = self
                .client
                .patch(&url)
                .bearer_auth(api_key)
                .header("Notion-Version", NOTION_VERSION)
                .json(&payload)
                .timeout(UPDATE_TIMEOUT)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            match result {
                Ok(_) => return Ok(()),
                Err(e) => {
                    if attempt >= UPDATE_ATTEMPTS {
                        return Err(e).with_context(|| {
                            format!("record update exhausted {UPDATE_ATTEMPTS} attempts: {id}")
                        });
                    }
                    debug!(attempt, max = UPDATE_ATTEMPTS, "record update failed: {e}");
                    attempt += 1;
                }
            }
        }
    }
}
