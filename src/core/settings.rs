use crate::domain::model::{supported_currency, Settings, SUPPORTED_CURRENCIES};
use crate::domain::ports::{keys, SettingsStore};
use crate::utils::error::{ConverterError, Result};
use crate::utils::validation::{validate_currency_code, validate_range, Validate};
use serde_json::{json, Value};

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_currency_code("targetCurrency", &self.target_currency)?;
        if supported_currency(&self.target_currency).is_none() {
            let codes: Vec<&str> = SUPPORTED_CURRENCIES.iter().map(|c| c.code).collect();
            return Err(ConverterError::InvalidConfigValueError {
                field: "targetCurrency".to_string(),
                value: self.target_currency.clone(),
                reason: format!("Supported currencies: {}", codes.join(", ")),
            });
        }
        validate_range("vatRate", self.vat_rate, 0.0, 1.0)
    }
}

/// Reads the user's settings, falling back to `defaults` per field.
/// Stored values that fail validation are ignored.
pub async fn load_settings<S: SettingsStore>(store: &S, defaults: &Settings) -> Result<Settings> {
    let target_currency = match store.get(keys::TARGET_CURRENCY).await? {
        Some(Value::String(code)) if supported_currency(&code).is_some() => code,
        Some(other) => {
            tracing::warn!("Ignoring stored target currency {}", other);
            defaults.target_currency.clone()
        }
        None => defaults.target_currency.clone(),
    };

    let vat_rate = match store.get(keys::VAT_RATE).await? {
        Some(value) => match value.as_f64() {
            Some(rate) if (0.0..=1.0).contains(&rate) => rate,
            _ => {
                tracing::warn!("Ignoring stored VAT rate {}", value);
                defaults.vat_rate
            }
        },
        None => defaults.vat_rate,
    };

    Ok(Settings {
        target_currency,
        vat_rate,
    })
}

/// Persists settings and, when given, the API key.
pub async fn save_settings<S: SettingsStore>(
    store: &S,
    settings: &Settings,
    api_key: Option<&str>,
) -> Result<()> {
    settings.validate()?;

    let mut entries = vec![
        (keys::TARGET_CURRENCY, json!(settings.target_currency)),
        (keys::VAT_RATE, json!(settings.vat_rate)),
    ];
    if let Some(key) = api_key {
        entries.push((keys::API_KEY, json!(key)));
    }

    store.set_many(entries).await?;
    tracing::info!(
        "Settings saved: target={} vat={}",
        settings.target_currency,
        settings.vat_rate
    );
    Ok(())
}
