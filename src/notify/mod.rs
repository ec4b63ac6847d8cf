//! Breach alert dispatch and message formatting.

use crate::core::monitor::Breach;
use crate::core::record::{PositionRecord, round_dp};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

pub mod webhook;

/// Dispatches a breach alert. `Err` means "not delivered" and must never be
/// treated as fatal by callers; the ratchet is conditioned on `Ok`.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, breach: Breach, record: &PositionRecord, price: f64) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

/// Human-readable subject/body for a breach alert.
pub fn format_alert(breach: Breach, record: &PositionRecord, price: f64) -> AlertMessage {
    let direction = breach.direction();
    let line = match breach {
        Breach::High => record.high_line,
        Breach::Low => record.low_line,
    }
    .unwrap_or(price);
    let symbol = record.display_symbol.as_deref().unwrap_or(&record.name);
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

    AlertMessage {
        subject: format!("{} {direction} breakout", record.name),
        body: format!(
            "Stock {} ({symbol})\nTime: {timestamp}\nCurrent price: {}\n{direction} breakout line: {}",
            record.name,
            round_dp(price, 2),
            round_dp(line, 2),
        ),
    }
}
