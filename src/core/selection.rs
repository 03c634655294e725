use crate::domain::model::SelectionMatch;
use crate::domain::ports::RateSource;
use crate::utils::error::Result;
use regex::Regex;

const SELECTION_PATTERN: &str = r"(?i)(?P<marker>US\$|CA\$|A\$|USD|EUR|GBP|JPY|CAD|AUD|\$|€|£|¥)\s*(?P<amount>\d{1,3}(?:,\d{3})*(?:\.\d{2})?)";

const SUBTOTAL_PATTERN: &str = r"\$([\d,.]+)";

/// Finds currency amounts in selected text and in cart subtotals.
#[derive(Debug, Clone)]
pub struct SelectionMatcher {
    selection: Regex,
    subtotal: Regex,
}

impl SelectionMatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            selection: Regex::new(SELECTION_PATTERN)?,
            subtotal: Regex::new(SUBTOTAL_PATTERN)?,
        })
    }

    /// First currency amount in `text`. A first match that runs straight
    /// into more digits (`$1234`, `$5.5`) is ambiguous and yields `None`.
    pub fn find(&self, text: &str) -> Option<SelectionMatch> {
        let caps = self.selection.captures(text)?;
        let marker = caps.name("marker")?;
        let amount = caps.name("amount")?;

        if runs_into_digits(&text[amount.end()..]) {
            tracing::debug!("Ambiguous amount in selection: {:?}", text);
            return None;
        }

        let code = currency_for_marker(marker.as_str())?;
        let amount = parse_amount(amount.as_str())?;

        Some(SelectionMatch {
            code: code.to_string(),
            amount,
        })
    }

    /// Dollar amount in a cart subtotal such as `"$1,234.00 USD"`.
    pub fn parse_subtotal(&self, text: &str) -> Option<f64> {
        let caps = self.subtotal.captures(text)?;
        parse_amount(caps.get(1)?.as_str())
    }
}

fn runs_into_digits(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some(',') | Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Symbol or code → ISO code.
pub fn currency_for_marker(marker: &str) -> Option<&'static str> {
    match marker.to_ascii_uppercase().as_str() {
        "$" | "US$" | "USD" => Some("USD"),
        "€" | "EUR" => Some("EUR"),
        "£" | "GBP" => Some("GBP"),
        "¥" | "JPY" => Some("JPY"),
        "CA$" | "CAD" => Some("CAD"),
        "A$" | "AUD" => Some("AUD"),
        _ => None,
    }
}

/// `amount` in `source` expressed in `target`.
pub fn convert<R: RateSource + ?Sized>(
    rates: &R,
    amount: f64,
    source: &str,
    target: &str,
) -> Option<f64> {
    let source_rate = rates.rate(source)?;
    let target_rate = rates.rate(target)?;
    Some(amount / source_rate * target_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RateTable;

    fn matcher() -> SelectionMatcher {
        SelectionMatcher::new().unwrap()
    }

    fn found(text: &str) -> Option<(String, f64)> {
        matcher().find(text).map(|m| (m.code, m.amount))
    }

    #[test]
    fn test_symbols_and_codes() {
        assert_eq!(found("only $19.99 today"), Some(("USD".into(), 19.99)));
        assert_eq!(found("€ 1,299.00"), Some(("EUR".into(), 1299.0)));
        assert_eq!(found("£45"), Some(("GBP".into(), 45.0)));
        assert_eq!(found("¥12,000"), Some(("JPY".into(), 12000.0)));
        assert_eq!(found("CA$30.50"), Some(("CAD".into(), 30.5)));
        assert_eq!(found("A$7"), Some(("AUD".into(), 7.0)));
        assert_eq!(found("US$100"), Some(("USD".into(), 100.0)));
        assert_eq!(found("GBP 12.34"), Some(("GBP".into(), 12.34)));
        assert_eq!(found("usd 5"), Some(("USD".into(), 5.0)));
    }

    #[test]
    fn test_only_first_match_is_used() {
        assert_eq!(found("was £10 now $8"), Some(("GBP".into(), 10.0)));
    }

    #[test]
    fn test_no_digits_no_match() {
        assert_eq!(found("free shipping over dollars"), None);
        assert_eq!(found("$"), None);
        assert_eq!(found(""), None);
    }

    #[test]
    fn test_ambiguous_amounts_are_discarded() {
        assert_eq!(found("$1234"), None);
        assert_eq!(found("$5.5"), None);
        assert_eq!(found("$1,23"), None);
        assert_eq!(found("costs $5."), Some(("USD".into(), 5.0)));
        assert_eq!(found("$1,234, thanks"), Some(("USD".into(), 1234.0)));
    }

    #[test]
    fn test_parse_subtotal() {
        let m = matcher();
        assert_eq!(m.parse_subtotal("$1,234.56 USD"), Some(1234.56));
        assert_eq!(m.parse_subtotal("Subtotal $80"), Some(80.0));
        assert_eq!(m.parse_subtotal("80 EUR"), None);
        assert_eq!(m.parse_subtotal("$1.2.3"), None);
    }

    #[test]
    fn test_convert_through_usd() {
        let rates = RateTable::fallback();
        let eur = convert(&rates, 79.0, "GBP", "EUR").unwrap();
        assert!((eur - 92.0).abs() < 1e-9);
        assert_eq!(convert(&rates, 1.0, "CHF", "EUR"), None);
    }
}
