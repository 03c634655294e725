use crate::core::format::format_currency;
use crate::core::price_calculator::breakdown;
use crate::core::selection::{convert, SelectionMatcher};
use crate::domain::model::{
    supported_currency, CartTotal, Overlay, Settings, SettingsMessage, BASE_CURRENCY,
};
use crate::domain::ports::RateSource;
use crate::utils::error::{ConverterError, Result};
use crate::utils::validation::Validate;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_BREAKDOWN_HOST: &str = "lttstore.com";
pub const CART_TOTAL_LABEL: &str = "Total (incl. VAT & shipping)";

/// Whether `page_url` belongs to the store that gets the full price breakdown.
pub fn is_breakdown_site(page_url: &str, breakdown_host: &str) -> bool {
    Url::parse(page_url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.contains(breakdown_host)))
        .unwrap_or(false)
}

/// Per-page state: the active settings plus the shared rates.
pub struct PageSession<R: RateSource> {
    rates: Arc<R>,
    matcher: SelectionMatcher,
    settings: Settings,
    breakdown_site: bool,
    vat_customized: bool,
}

impl<R: RateSource> PageSession<R> {
    pub fn new(rates: Arc<R>, settings: Settings, breakdown_site: bool) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            rates,
            matcher: SelectionMatcher::new()?,
            settings,
            breakdown_site,
            vat_customized: false,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vat_customized(&self) -> bool {
        self.vat_customized
    }

    /// Overlay for a text selection, or `None` when nothing usable was selected.
    pub fn on_selection(&self, text: &str) -> Option<Overlay> {
        let found = self.matcher.find(text.trim())?;
        let target = supported_currency(&self.settings.target_currency)?;

        if self.breakdown_site {
            let amount_usd = convert(self.rates.as_ref(), found.amount, &found.code, BASE_CURRENCY)?;
            let breakdown = breakdown(
                self.rates.as_ref(),
                amount_usd,
                target.code,
                self.settings.vat_rate,
            )?;
            return Some(Overlay::Breakdown {
                symbol: target.symbol,
                breakdown,
            });
        }

        let amount = convert(self.rates.as_ref(), found.amount, &found.code, target.code)?;
        Some(Overlay::Conversion {
            symbol: target.symbol,
            amount,
        })
    }

    /// Converted grand total for the cart subtotal text.
    pub fn cart_total(&self, subtotal_text: &str) -> Option<CartTotal> {
        let Some(subtotal_usd) = self.matcher.parse_subtotal(subtotal_text) else {
            tracing::warn!("Could not parse subtotal amount from {:?}", subtotal_text);
            return None;
        };

        let target = &self.settings.target_currency;
        let details = breakdown(self.rates.as_ref(), subtotal_usd, target, self.settings.vat_rate)?;

        Some(CartTotal {
            label: CART_TOTAL_LABEL,
            value: format_currency(target, details.total),
        })
    }

    pub fn handle_message(&mut self, message: SettingsMessage) -> Result<()> {
        match message {
            SettingsMessage::UpdateSettings {
                target_currency,
                vat_rate,
            } => {
                let settings = Settings {
                    target_currency,
                    vat_rate,
                };
                settings.validate()?;
                tracing::info!(
                    "Settings updated: target={} vat={}",
                    settings.target_currency,
                    settings.vat_rate
                );
                self.settings = settings;
                Ok(())
            }
        }
    }

    /// Currency selector change.
    pub fn set_target_currency(&mut self, code: &str) -> Result<()> {
        let settings = Settings {
            target_currency: code.to_string(),
            ..self.settings.clone()
        };
        settings.validate()?;
        tracing::info!("Target currency changed to {}", code);
        self.settings = settings;
        Ok(())
    }

    /// VAT control input, a percentage between 0 and 100.
    pub fn set_vat_percent(&mut self, input: &str) -> Result<()> {
        let percent = input
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| (0.0..=100.0).contains(p))
            .ok_or_else(|| ConverterError::ValidationError {
                message: "Please enter a valid percentage between 0 and 100".to_string(),
            })?;

        self.settings.vat_rate = percent / 100.0;
        self.vat_customized = true;
        tracing::info!("VAT rate updated to {}%", percent);
        Ok(())
    }

    /// Label of the VAT control, e.g. `VAT: 20%`.
    pub fn vat_label(&self) -> String {
        let percent = (self.settings.vat_rate * 10_000.0).round() / 100.0;
        format!("VAT: {}%", percent)
    }
}
