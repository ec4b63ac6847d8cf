//! Reconciliation run: load the ledger, price it, write back valuations and
//! run the threshold pass. One invocation = one single-pass run.

use crate::core::record::{PositionRecord, PropertyPatch, RecordKind, round_dp};
use crate::core::{currency, monitor, symbol, valuation};
use crate::market::MarketDataProvider;
use crate::notify::AlertNotifier;
use crate::store::RecordStore;
use crate::store::notion::{
    ASSETS_PROP, CURRENCY_PROP, HIGH_LINE_PROP, LAST_PRICE_PROP, LOW_LINE_PROP, RATIO_PROP,
    USD_PRICE_PROP,
};
use anyhow::{Result, bail};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Run valuation only; skip the threshold pass entirely.
    pub skip_alerts: bool,
    /// Listing-currency inference; the suffix heuristic by default.
    pub infer_currency: symbol::CurrencyInference,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        ReconcileOptions {
            skip_alerts: false,
            infer_currency: symbol::infer_currency,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub updated: usize,
    pub alerts_sent: usize,
    pub failures: usize,
}

/// One reconciliation pass over the whole ledger.
///
/// Fatal only when the ledger is unreadable/empty or the valuation rejects
/// the cash record; everything else degrades per record.
pub async fn reconcile(
    store: &dyn RecordStore,
    market: &dyn MarketDataProvider,
    notifier: &dyn AlertNotifier,
    options: &ReconcileOptions,
) -> Result<RunSummary> {
    let mut records = store.query_records().await?;
    if records.is_empty() {
        bail!("record store returned no ledger entries");
    }
    info!(count = records.len(), "loaded ledger records");

    for record in records.iter_mut().filter(|r| r.is_stock()) {
        record.currency = Some((options.infer_currency)(&record.name).to_string());
    }

    let currencies: Vec<String> = records
        .iter()
        .filter(|r| r.is_stock())
        .filter_map(|r| r.currency.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let rates = currency::rates_to_usd(&currencies, market).await;

    let codes: Vec<String> = records
        .iter()
        .filter(|r| r.is_stock() && !r.name.is_empty() && symbol::is_valid_code(&r.name))
        .map(|r| r.name.clone())
        .collect();
    debug!(?codes, "pricing instrument codes");
    let quotes = market.fetch_quotes(&codes).await;

    let records = valuation::value(records, &quotes, &rates)?;

    let mut summary = RunSummary {
        total: records.len(),
        ..RunSummary::default()
    };

    for record in &records {
        match write_back(store, record).await {
            Ok(true) => {
                summary.updated += 1;
                debug!(record = %record.name, "record updated");
            }
            Ok(false) => {}
            Err(e) => {
                warn!(record = %record.name, "write-back failed: {e:#}");
                summary.failures += 1;
                continue;
            }
        }

        if !options.skip_alerts && record.is_stock() {
            if let Some(price) = record.last_price {
                if monitor_record(store, notifier, record, price).await {
                    summary.alerts_sent += 1;
                }
            }
        }
    }

    info!(
        total = summary.total,
        updated = summary.updated,
        alerts = summary.alerts_sent,
        failures = summary.failures,
        "reconciliation finished"
    );
    Ok(summary)
}

/// Flush one record's derived fields. Stocks write two property groups, each
/// retried independently by the store; unpriced stocks write nothing.
/// Returns whether anything was written.
async fn write_back(store: &dyn RecordStore, record: &PositionRecord) -> Result<bool> {
    match record.kind {
        RecordKind::Stock => {
            let (Some(last_price), Some(usd_price)) = (record.last_price, record.usd_price) else {
                debug!(record = %record.name, "no quote; skipping write-back");
                return Ok(false);
            };
            let mut prices = PropertyPatch::new()
                .number(LAST_PRICE_PROP, round_dp(last_price, 4))
                .number(USD_PRICE_PROP, round_dp(usd_price, 4));
            if let Some(currency) = &record.currency {
                prices = prices.select(CURRENCY_PROP, currency);
            }
            store.update_record(&record.id, &prices).await?;
            store
                .update_record(&record.id, &assets_patch(record))
                .await?;
            Ok(true)
        }
        RecordKind::Cash | RecordKind::NetAsset => {
            store
                .update_record(&record.id, &assets_patch(record))
                .await?;
            Ok(true)
        }
    }
}

fn assets_patch(record: &PositionRecord) -> PropertyPatch {
    PropertyPatch::new()
        .number(ASSETS_PROP, round_dp(record.new_assets.unwrap_or(0.0), 2))
        .number(RATIO_PROP, round_dp(record.new_ratio.unwrap_or(0.0), 4))
}

/// Threshold pass for one priced stock. Returns true when an alert was
/// dispatched. The ratchet write is best-effort and only attempted after a
/// confirmed dispatch; an un-notified breach must not widen its own band.
async fn monitor_record(
    store: &dyn RecordStore,
    notifier: &dyn AlertNotifier,
    record: &PositionRecord,
    price: f64,
) -> bool {
    let Some(breach) = monitor::check_lines(record.high_line, record.low_line, price) else {
        return false;
    };
    info!(
        code = %record.name,
        direction = breach.direction(),
        price,
        "threshold line breached"
    );

    match notifier.notify(breach, record, price).await {
        Ok(()) => {
            let new_line = round_dp(monitor::ratchet(breach, price), 2);
            let line_prop = match breach {
                monitor::Breach::High => HIGH_LINE_PROP,
                monitor::Breach::Low => LOW_LINE_PROP,
            };
            let patch = PropertyPatch::new().number(line_prop, new_line);
            match store.update_record(&record.id, &patch).await {
                Ok(()) => info!(code = %record.name, new_line, "trigger line ratcheted"),
                Err(e) => {
                    warn!(code = %record.name, "failed to persist ratcheted line: {e:#}")
                }
            }
            true
        }
        Err(e) => {
            warn!(code = %record.name, "alert dispatch failed; line left unchanged: {e:#}");
            false
        }
    }
}
