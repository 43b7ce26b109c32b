/// The only settlement currency a normalized order may carry
pub const USD: &str = "USD";

/// Historical tickers that have since been renamed, mapped to the current ticker
const ALIASES: &[(&str, &str)] = &[
    // Bitcoin Cash was briefly listed as BCC after the fork
    ("BCC", "BCH"),
    ("XBT", "BTC"),
];

/// Fiat currencies which can settle an order. Only USD is supported as a cost basis.
const FIAT: &[&str] = &["USD", "EUR", "GBP", "CAD", "AUD", "JPY", "CHF"];

/// Upper-cased symbol with known historical aliases resolved
pub fn canonical_symbol(symbol: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == symbol)
        .map(|(_, current)| current.to_string())
        .unwrap_or(symbol)
}

pub fn is_fiat(symbol: &str) -> bool {
    FIAT.contains(&canonical_symbol(symbol).as_str())
}

/// Canonical trading pair name, e.g. `BTC-USD`
pub fn pair(base: &str, quote: &str) -> String {
    format!("{}-{}", canonical_symbol(base), canonical_symbol(quote))
}

/// Splits and canonicalizes a `BASE-QUOTE` pair
pub fn split_pair(pair: &str) -> Option<(String, String)> {
    let (base, quote) = pair.split_once(['-', '/'])?;
    if base.trim().is_empty() || quote.trim().is_empty() {
        return None;
    }
    Some((canonical_symbol(base), canonical_symbol(quote)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_cash_alias() {
        assert_eq!(canonical_symbol("BCC"), "BCH");
        assert_eq!(canonical_symbol("bcc"), "BCH");
        assert_eq!(canonical_symbol("BCH"), "BCH");
    }

    #[test]
    fn unknown_symbols_pass_through_upper_cased() {
        assert_eq!(canonical_symbol(" eth "), "ETH");
    }

    #[test]
    fn fiat_detection() {
        assert!(is_fiat("usd"));
        assert!(is_fiat("EUR"));
        assert!(!is_fiat("BTC"));
        assert!(!is_fiat("USDT"));
    }

    #[test]
    fn pairs_are_canonical() {
        assert_eq!(pair("xbt", "usd"), "BTC-USD");
        assert_eq!(
            split_pair("BCC-BTC"),
            Some(("BCH".to_string(), "BTC".to_string()))
        );
        assert_eq!(
            split_pair("XMR/BTC"),
            Some(("XMR".to_string(), "BTC".to_string()))
        );
        assert_eq!(split_pair("BTCUSD"), None);
        assert_eq!(split_pair("-USD"), None);
    }
}
