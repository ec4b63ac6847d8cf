//! Instrument-code heuristics: listing-currency inference and code validity.

/// Suffixes accepted by the market data upstream.
const VALID_SUFFIXES: &[&str] = &[".HK", ".SZ", ".SH", ".O", ".N", ".T"];

/// Signature of a currency inference; [`infer_currency`] is the default and
/// can be swapped at the call site.
pub type CurrencyInference = fn(&str) -> &'static str;

/// Infer the listing currency from the instrument code's suffix.
///
/// This is a heuristic over exchange suffixes, not a lookup against the true
/// listing currency; unknown suffixes (and bare US tickers) default to USD.
pub fn infer_currency(code: &str) -> &'static str {
    if code.ends_with(".HK") {
        "HKD"
    } else if code.ends_with(".SZ") || code.ends_with(".SH") {
        "CNY"
    } else if code.ends_with(".T") {
        "JPY"
    } else {
        // Covers .O, .N and everything unrecognized
        "USD"
    }
}

/// True if the code ends with a whitelisted exchange suffix, or looks like a
/// bare US-style ticker (at most 5 alphabetic characters). Invalid codes are
/// excluded from quote requests but stay in the ledger un-priced.
pub fn is_valid_code(code: &str) -> bool {
    VALID_SUFFIXES.iter().any(|s| code.ends_with(s))
        || (!code.is_empty() && code.len() <= 5 && code.chars().all(|c| c.is_ascii_alphabetic()))
}
