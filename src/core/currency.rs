//! Currency normalization: maps currency codes to USD conversion rates,
//! handling the two quoting conventions the FX upstream uses.

use crate::market::MarketDataProvider;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// The FX pair quoting a currency. Pairs whose base is USD quote the foreign
/// currency per USD and must be inverted before use.
fn pair_for(currency: &str) -> String {
    match currency {
        "CNY" | "RMB" => "USDCNY.FX".to_string(),
        "HKD" => "HKDUSD.FX".to_string(),
        "JPY" => "JPYUSD.FX".to_string(),
        "EUR" => "EURUSD.FX".to_string(),
        other => format!("{other}USD.FX"),
    }
}

/// Fetch USD conversion rates for the given currencies in one batched call.
///
/// The result always contains `USD -> 1.0`; USD is never sent upstream.
/// Currencies whose quote is missing or unusable are absent from the result;
/// falling back to 1.0 is a call-site decision, never made here.
pub async fn rates_to_usd(
    currencies: &[String],
    provider: &dyn MarketDataProvider,
) -> HashMap<String, f64> {
    let mut rates = HashMap::new();
    rates.insert("USD".to_string(), 1.0);

    let pairs: BTreeSet<String> = currencies
        .iter()
        .map(|c| c.to_uppercase())
        .filter(|c| !c.is_empty() && c != "USD")
        .map(|c| pair_for(&c))
        .collect();
    if pairs.is_empty() {
        return rates;
    }

    let pairs: Vec<String> = pairs.into_iter().collect();
    debug!(?pairs, "fetching FX rates");
    let quoted = provider.fetch_fx(&pairs).await;

    for (pair, rate) in quoted {
        // Pair names are {BASE}{QUOTE} before the exchange suffix. The map is
        // keyed by whatever the upstream echoed back, so the name must be
        // validated before slicing.
        let code = pair.split('.').next().unwrap_or(&pair);
        if code.len() < 6 || !code.is_ascii() {
            warn!(pair = %pair, "unrecognized FX pair name; dropping");
            continue;
        }
        let (base, quote) = code.split_at(3);
        if quote == "USD" {
            rates.insert(base.to_string(), rate);
        } else if base == "USD" {
            if rate == 0.0 {
                warn!(pair = %pair, "zero FX rate; dropping");
                continue;
            }
            rates.insert(quote.to_string(), 1.0 / rate);
        } else {
            warn!(pair = %pair, "FX pair does not quote USD; dropping");
        }
    }

    rates
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedFxProvider {
        fx: HashMap<String, f64>,
    }

    #[async_trait]
    impl MarketDataProvider for FixedFxProvider {
        async fn fetch_quotes(&self, _codes: &[String]) -> HashMap<String, f64> {
            HashMap::new()
        }

        async fn fetch_fx(&self, pairs: &[String]) -> HashMap<String, f64> {
            pairs
                .iter()
                .filter_map(|p| self.fx.get(p).map(|r| (p.clone(), *r)))
                .collect()
        }
    }

    fn provider(entries: &[(&str, f64)]) -> FixedFxProvider {
        FixedFxProvider {
            fx: entries.iter().map(|(p, r)| (p.to_string(), *r)).collect(),
        }
    }

    #[tokio::test]
    async fn test_usd_is_always_one_and_never_requested() {
        let provider = provider(&[]);
        let rates = rates_to_usd(&["USD".to_string()], &provider).await;
        assert_eq!(rates.len(), 1);
        assert_eq!(rates["USD"], 1.0);
    }

    #[tokio::test]
    async fn test_reciprocal_law_for_cny() {
        // USDCNY quotes CNY per USD, so the USD rate is the reciprocal.
        let provider = provider(&[("USDCNY.FX", 7.25)]);
        let rates = rates_to_usd(&["CNY".to_string()], &provider).await;
        assert!((rates["CNY"] - 1.0 / 7.25).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_hkd_uses_raw_rate_without_inversion() {
        let provider = provider(&[("HKDUSD.FX", 0.1278)]);
        let rates = rates_to_usd(&["HKD".to_string()], &provider).await;
        assert_eq!(rates["HKD"], 0.1278);
    }

    #[tokio::test]
    async fn test_unmapped_currency_synthesizes_pair() {
        let provider = provider(&[("GBPUSD.FX", 1.27)]);
        let rates = rates_to_usd(&["GBP".to_string()], &provider).await;
        assert_eq!(rates["GBP"], 1.27);
    }

    #[tokio::test]
    async fn test_rmb_aliases_to_cny_pair() {
        let provider = provider(&[("USDCNY.FX", 7.0)]);
        let rates = rates_to_usd(&["RMB".to_string()], &provider).await;
        assert!((rates["CNY"] - 1.0 / 7.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_missing_quote_drops_currency_silently() {
        let provider = provider(&[]);
        let rates = rates_to_usd(&["JPY".to_string()], &provider).await;
        assert!(!rates.contains_key("JPY"));
        assert_eq!(rates["USD"], 1.0);
    }

    #[tokio::test]
    async fn test_non_ascii_pair_name_is_dropped_without_panicking() {
        // A malformed upstream key must degrade like any other bad quote.
        let provider = provider(&[("ABÉUSD.FX", 1.5)]);
        let rates = rates_to_usd(&["ABé".to_string()], &provider).await;
        assert_eq!(rates.len(), 1);
        assert_eq!(rates["USD"], 1.0);
    }

    #[tokio::test]
    async fn test_zero_usd_base_rate_is_dropped() {
        let provider = provider(&[("USDCNY.FX", 0.0)]);
        let rates = rates_to_usd(&["CNY".to_string()], &provider).await;
        assert!(!rates.contains_key("CNY"));
    }
}
