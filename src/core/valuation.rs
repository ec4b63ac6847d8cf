//! Valuation engine: per-position USD asset value, net asset value and
//! weight ratios. Pure over the quotes and rates it is given.

use crate::core::record::{PositionRecord, RecordKind};
use anyhow::{Result, bail};
use std::collections::HashMap;
use tracing::debug;

/// Recompute USD prices, asset values and ratios for every record.
///
/// Requires exactly one cash record with numeric stored assets; without it
/// there is no meaningful net asset value and the whole valuation fails.
/// Stocks without a quote are explicitly zeroed, not skipped, so a missing
/// price pulls down the portfolio total and every ratio.
///
/// No rounding happens here; rounding is applied once at the external write
/// boundary to avoid compounding error across steps.
pub fn value(
    mut records: Vec<PositionRecord>,
    quotes: &HashMap<String, f64>,
    rates: &HashMap<String, f64>,
) -> Result<Vec<PositionRecord>> {
    let cash_count = records.iter().filter(|r| r.kind == RecordKind::Cash).count();
    if cash_count != 1 {
        bail!("expected exactly one cash record, found {cash_count}");
    }
    if records.iter().filter(|r| r.kind == RecordKind::NetAsset).count() > 1 {
        bail!("more than one net-asset record in the ledger");
    }

    let cash_assets = match records
        .iter()
        .find(|r| r.kind == RecordKind::Cash)
        .and_then(|r| r.current_assets)
    {
        Some(v) => v,
        None => bail!("cash record has no numeric stored assets"),
    };

    let mut stock_total = 0.0;
    for record in records.iter_mut().filter(|r| r.is_stock()) {
        record.new_assets = Some(0.0);
        let Some(&quote) = quotes.get(&record.name) else {
            debug!(code = %record.name, "no quote; assets zeroed");
            continue;
        };
        let rate = record
            .currency
            .as_deref()
            .and_then(|c| rates.get(c))
            .copied()
            .unwrap_or(1.0);
        let usd_price = quote * rate;
        let assets = usd_price * record.shares;

        record.last_price = Some(quote);
        record.usd_price = Some(usd_price);
        record.new_assets = Some(assets);
        stock_total += assets;
    }

    let net_asset_value = cash_assets + stock_total;
    for record in &mut records {
        match record.kind {
            RecordKind::Cash => record.new_assets = Some(cash_assets),
            RecordKind::NetAsset => record.new_assets = Some(net_asset_value),
            RecordKind::Stock => {}
        }
        let assets = record.new_assets.unwrap_or(0.0);
        record.new_ratio = Some(if net_asset_value != 0.0 {
            assets / net_asset_value
        } else {
            0.0
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{CASH_NAME, NET_ASSET_NAME, round_dp};

    fn cash(assets: f64) -> PositionRecord {
        let mut r = PositionRecord::new("cash-id", CASH_NAME);
        r.current_assets = Some(assets);
        r
    }

    fn net_asset() -> PositionRecord {
        PositionRecord::new("net-id", NET_ASSET_NAME)
    }

    fn stock(name: &str, shares: f64, currency: &str) -> PositionRecord {
        let mut r = PositionRecord::new(format!("id-{name}"), name);
        r.shares = shares;
        r.currency = Some(currency.to_string());
        r
    }

    fn quotes(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        // Cash $10,000 + 10 AAPL at $150 => stock $1,500, NAV $11,500
        let records = vec![cash(10_000.0), stock("AAPL", 10.0, "USD")];
        let quotes = quotes(&[("AAPL", 150.0)]);
        let rates = HashMap::from([("USD".to_string(), 1.0)]);

        let valued = value(records, &quotes, &rates).unwrap();

        let cash = valued.iter().find(|r| r.kind == RecordKind::Cash).unwrap();
        let aapl = valued.iter().find(|r| r.name == "AAPL").unwrap();
        assert_eq!(aapl.new_assets, Some(1500.0));
        assert_eq!(cash.new_assets, Some(10_000.0));
        assert_eq!(round_dp(cash.new_ratio.unwrap(), 4), 0.8696);
        assert_eq!(round_dp(aapl.new_ratio.unwrap(), 4), 0.1304);
    }

    #[test]
    fn test_conservation_and_net_asset_record() {
        let records = vec![
            cash(1000.0),
            net_asset(),
            stock("AAPL", 2.0, "USD"),
            stock("0700.HK", 100.0, "HKD"),
        ];
        let quotes = quotes(&[("AAPL", 150.0), ("0700.HK", 500.0)]);
        let rates = HashMap::from([("USD".to_string(), 1.0), ("HKD".to_string(), 0.128)]);

        let valued = value(records, &quotes, &rates).unwrap();

        let stock_sum: f64 = valued
            .iter()
            .filter(|r| r.is_stock())
            .map(|r| r.new_assets.unwrap())
            .sum();
        let net = valued
            .iter()
            .find(|r| r.kind == RecordKind::NetAsset)
            .unwrap();
        assert_eq!(net.new_assets, Some(1000.0 + stock_sum));

        // Ratios over all non net-asset records sum to 1 within tolerance
        let ratio_sum: f64 = valued
            .iter()
            .filter(|r| r.kind != RecordKind::NetAsset)
            .map(|r| r.new_ratio.unwrap())
            .sum();
        assert!((ratio_sum - 1.0).abs() < 1e-9);
        assert!((net.new_ratio.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_currency_conversion_applies_to_usd_price() {
        let records = vec![cash(0.0), stock("0700.HK", 10.0, "HKD")];
        let quotes = quotes(&[("0700.HK", 500.0)]);
        let rates = HashMap::from([("HKD".to_string(), 0.1278)]);

        let valued = value(records, &quotes, &rates).unwrap();
        let hk = valued.iter().find(|r| r.name == "0700.HK").unwrap();
        assert_eq!(hk.last_price, Some(500.0));
        assert!((hk.usd_price.unwrap() - 63.9).abs() < 1e-9);
        assert!((hk.new_assets.unwrap() - 639.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_rate_defaults_to_one() {
        let records = vec![cash(0.0), stock("7203.T", 1.0, "JPY")];
        let quotes = quotes(&[("7203.T", 2500.0)]);
        let rates = HashMap::new();

        let valued = value(records, &quotes, &rates).unwrap();
        let toyota = valued.iter().find(|r| r.name == "7203.T").unwrap();
        assert_eq!(toyota.usd_price, Some(2500.0));
    }

    #[test]
    fn test_partial_failure_isolation() {
        // 5 stocks, quotes for only 3: run completes, missing ones zeroed.
        let records = vec![
            cash(1000.0),
            stock("A", 1.0, "USD"),
            stock("B", 1.0, "USD"),
            stock("C", 1.0, "USD"),
            stock("D", 1.0, "USD"),
            stock("E", 1.0, "USD"),
        ];
        let quotes = quotes(&[("A", 10.0), ("B", 20.0), ("C", 30.0)]);
        let rates = HashMap::from([("USD".to_string(), 1.0)]);

        let valued = value(records, &quotes, &rates).unwrap();
        assert_eq!(
            valued.iter().find(|r| r.name == "D").unwrap().new_assets,
            Some(0.0)
        );
        assert_eq!(
            valued.iter().find(|r| r.name == "E").unwrap().new_assets,
            Some(0.0)
        );
        let cash = valued.iter().find(|r| r.kind == RecordKind::Cash).unwrap();
        assert!((cash.new_ratio.unwrap() - 1000.0 / 1060.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_nav_gives_zero_ratios() {
        let records = vec![cash(0.0), stock("A", 10.0, "USD")];
        let valued = value(records, &HashMap::new(), &HashMap::new()).unwrap();
        for record in &valued {
            assert_eq!(record.new_ratio, Some(0.0));
        }
    }

    #[test]
    fn test_missing_cash_record_is_fatal() {
        let records = vec![stock("AAPL", 1.0, "USD")];
        assert!(value(records, &HashMap::new(), &HashMap::new()).is_err());
    }

    #[test]
    fn test_cash_without_numeric_assets_is_fatal() {
        let records = vec![PositionRecord::new("cash-id", CASH_NAME)];
        assert!(value(records, &HashMap::new(), &HashMap::new()).is_err());
    }

    #[test]
    fn test_duplicate_cash_records_are_fatal() {
        let records = vec![cash(1.0), cash(2.0)];
        assert!(value(records, &HashMap::new(), &HashMap::new()).is_err());
    }
}
