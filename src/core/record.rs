//! Ledger record types and the typed property patch written back to the store.

use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Reserved sentinel name for the cash row.
pub const CASH_NAME: &str = "Cash";
/// Reserved sentinel name for the net-asset row.
pub const NET_ASSET_NAME: &str = "Net Asset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Stock,
    Cash,
    NetAsset,
}

impl RecordKind {
    /// Classification is by exact name match against the sentinel names;
    /// everything else is a stock row.
    pub fn from_name(name: &str) -> Self {
        match name {
            CASH_NAME => RecordKind::Cash,
            NET_ASSET_NAME => RecordKind::NetAsset,
            _ => RecordKind::Stock,
        }
    }
}

/// One row of the portfolio ledger.
///
/// `new_assets`, `new_ratio` and `usd_price` are derived fresh every run and
/// never round-tripped from storage.
#[derive(Debug, Clone)]
pub struct PositionRecord {
    pub id: String,
    pub name: String,
    pub display_symbol: Option<String>,
    pub kind: RecordKind,
    pub shares: f64,
    pub currency: Option<String>,
    pub last_price: Option<f64>,
    pub usd_price: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_ratio: Option<f64>,
    pub high_line: Option<f64>,
    pub low_line: Option<f64>,
    pub new_assets: Option<f64>,
    pub new_ratio: Option<f64>,
}

impl PositionRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let kind = RecordKind::from_name(&name);
        PositionRecord {
            id: id.into(),
            name,
            display_symbol: None,
            kind,
            shares: 0.0,
            currency: None,
            last_price: None,
            usd_price: None,
            current_assets: None,
            current_ratio: None,
            high_line: None,
            low_line: None,
            new_assets: None,
            new_ratio: None,
        }
    }

    pub fn is_stock(&self) -> bool {
        self.kind == RecordKind::Stock
    }
}

/// Round to `dp` decimal places. Applied only at the external write boundary
/// so intermediate arithmetic keeps full precision.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

/// A typed property value, encoded per field type for the record store.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Select(String),
    RichText(String),
}

impl PropertyValue {
    pub fn encode(&self) -> Value {
        match self {
            PropertyValue::Number(n) => json!({ "number": n }),
            PropertyValue::Select(s) => json!({ "select": { "name": s } }),
            PropertyValue::RichText(s) => {
                json!({ "rich_text": [{ "text": { "content": s } }] })
            }
        }
    }
}

/// Partial field-name → value map, applied to a record as a merge-patch.
/// Fields not mentioned are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    fields: BTreeMap<String, PropertyValue>,
}

impl PropertyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number(mut self, field: &str, value: f64) -> Self {
        self.fields.insert(field.to_string(), PropertyValue::Number(value));
        self
    }

    pub fn select(mut self, field: &str, value: &str) -> Self {
        self.fields
            .insert(field.to_string(), PropertyValue::Select(value.to_string()));
        self
    }

    pub fn rich_text(mut self, field: &str, value: &str) -> Self {
        self.fields
            .insert(field.to_string(), PropertyValue::RichText(value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `properties` object of the store's PATCH payload.
    pub fn encode(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (field, value) in &self.fields {
            map.insert(field.clone(), value.encode());
        }
        Value::Object(map)
    }
}
