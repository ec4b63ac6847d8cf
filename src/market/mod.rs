//! Market data gateway abstractions.

use async_trait::async_trait;
use std::collections::HashMap;

pub mod ifind;
pub mod yahoo;

/// A source of latest prices for instruments and FX pairs.
///
/// Both operations degrade on failure: a code the upstream cannot price is
/// simply absent from the result, and a transport-level failure yields an
/// empty map. No error ever crosses this boundary.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Last-traded prices keyed by instrument code.
    async fn fetch_quotes(&self, codes: &[String]) -> HashMap<String, f64>;

    /// Latest FX rates keyed by the requested pair name.
    async fn fetch_fx(&self, pairs: &[String]) -> HashMap<String, f64>;
}
