use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BASE_CURRENCY: &str = "USD";

/// Currency code → value of one US dollar in that currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Keeps only finite, positive rates and pins USD to 1.0.
    pub fn from_feed(rates: HashMap<String, f64>) -> Self {
        let mut rates: HashMap<String, f64> = rates
            .into_iter()
            .filter(|(code, rate)| {
                let keep = rate.is_finite() && *rate > 0.0;
                if !keep {
                    tracing::debug!("Dropping unusable rate {}={}", code, rate);
                }
                keep
            })
            .collect();
        rates.insert(BASE_CURRENCY.to_string(), 1.0);
        Self { rates }
    }

    /// Built-in rates used when nothing has been fetched yet.
    pub fn fallback() -> Self {
        let rates = [
            ("USD", 1.0),
            ("EUR", 0.92),
            ("GBP", 0.79),
            ("JPY", 144.50),
            ("CAD", 1.35),
            ("AUD", 1.56),
        ]
        .into_iter()
        .map(|(code, rate)| (code.to_string(), rate))
        .collect();
        Self { rates }
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Entries sorted by currency code.
    pub fn sorted(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<_> = self.rates.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub target_currency: String,
    pub vat_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_currency: "EUR".to_string(),
            vat_rate: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBreakdown {
    pub base: f64,
    pub shipping: f64,
    pub vat: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedCurrency {
    pub code: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
}

pub const SUPPORTED_CURRENCIES: [SupportedCurrency; 6] = [
    SupportedCurrency { code: "EUR", symbol: "€", name: "Euro" },
    SupportedCurrency { code: "USD", symbol: "$", name: "US Dollar" },
    SupportedCurrency { code: "GBP", symbol: "£", name: "British Pound" },
    SupportedCurrency { code: "JPY", symbol: "¥", name: "Japanese Yen" },
    SupportedCurrency { code: "CAD", symbol: "CA$", name: "Canadian Dollar" },
    SupportedCurrency { code: "AUD", symbol: "A$", name: "Australian Dollar" },
];

pub fn supported_currency(code: &str) -> Option<&'static SupportedCurrency> {
    SUPPORTED_CURRENCIES.iter().find(|c| c.code == code)
}

/// First currency amount found in a piece of selected text.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionMatch {
    pub code: String,
    pub amount: f64,
}

/// What gets shown next to a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Conversion {
        symbol: &'static str,
        amount: f64,
    },
    Breakdown {
        symbol: &'static str,
        breakdown: PriceBreakdown,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTotal {
    pub label: &'static str,
    pub value: String,
}

/// Messages sent from the settings UI to the page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SettingsMessage {
    #[serde(rename_all = "camelCase")]
    UpdateSettings { target_currency: String, vat_rate: f64 },
}

/// Body of `GET /<key>/latest/USD`.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestRatesResponse {
    pub result: String,
    #[serde(default)]
    pub conversion_rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    pub error_type: Option<String>,
}

impl LatestRatesResponse {
    pub fn is_success(&self) -> bool {
        self.result == "success"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_drops_unusable_rates_and_pins_usd() {
        let mut feed = HashMap::new();
        feed.insert("EUR".to_string(), 0.9);
        feed.insert("XXX".to_string(), 0.0);
        feed.insert("YYY".to_string(), -2.0);
        feed.insert("USD".to_string(), 1.0001);

        let table = RateTable::from_feed(feed);
        assert_eq!(table.get("EUR"), Some(0.9));
        assert_eq!(table.get("XXX"), None);
        assert_eq!(table.get("YYY"), None);
        assert_eq!(table.get("USD"), Some(1.0));
    }

    #[test]
    fn update_settings_message_uses_wire_names() {
        let json = r#"{"action":"updateSettings","targetCurrency":"GBP","vatRate":0.15}"#;
        let msg: SettingsMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            SettingsMessage::UpdateSettings {
                target_currency: "GBP".to_string(),
                vat_rate: 0.15
            }
        );
        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["action"], "updateSettings");
        assert_eq!(back["targetCurrency"], "GBP");
    }

    #[test]
    fn error_response_carries_error_type() {
        let json = r#"{"result":"error","error-type":"invalid-key"}"#;
        let resp: LatestRatesResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.error_type.as_deref(), Some("invalid-key"));
        assert!(resp.conversion_rates.is_empty());
    }

    #[test]
    fn every_supported_currency_has_a_fallback_rate() {
        let fallback = RateTable::fallback();
        for currency in SUPPORTED_CURRENCIES {
            assert!(fallback.get(currency.code).is_some(), "{}", currency.code);
        }
    }
}
