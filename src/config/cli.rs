use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_range, validate_url, Validate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "currency-lens")]
#[command(about = "Convert prices in selected text and cart subtotals using cached exchange rates")]
pub struct CliConfig {
    #[arg(long, global = true, help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Settings store (JSON file); overrides cache.store_path")]
    pub store: Option<PathBuf>,

    #[arg(long, global = true, help = "URL of the page the text was taken from")]
    pub url: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Convert the first amount found in selected text
    Convert { text: String },
    /// Grand total for a cart subtotal such as "$120.00 USD"
    Cart { subtotal: String },
    /// Shipping, VAT and total for a USD amount
    Breakdown {
        amount: f64,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, help = "VAT in percent")]
        vat: Option<f64>,
    },
    /// Fetch rates unless the cached ones are still fresh
    Refresh,
    /// Print the rate table in use
    Rates,
    /// Validate the API key and save settings
    Configure {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long, help = "VAT in percent")]
        vat: Option<f64>,
    },
    /// Keep refreshing rates on a timer until interrupted
    Watch,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.url {
            validate_url("url", url)?;
        }
        if let Some(store) = &self.store {
            validate_path("store", &store.to_string_lossy())?;
        }
        match &self.command {
            Command::Breakdown { amount, vat, .. } => {
                validate_range("amount", *amount, 0.0, f64::MAX)?;
                if let Some(vat) = vat {
                    validate_range("vat", *vat, 0.0, 100.0)?;
                }
            }
            Command::Configure { vat: Some(vat), .. } => {
                validate_range("vat", *vat, 0.0, 100.0)?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert_with_globals() {
        let cli = CliConfig::try_parse_from([
            "currency-lens",
            "--verbose",
            "convert",
            "$19.99",
            "--url",
            "https://www.lttstore.com/products/x",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Convert { ref text } if text == "$19.99"));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_breakdown_vat_out_of_range() {
        let cli = CliConfig::try_parse_from(["currency-lens", "breakdown", "100", "--vat", "120"])
            .unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_bad_page_url() {
        let cli = CliConfig::try_parse_from(["currency-lens", "--url", "nope", "rates"]).unwrap();
        assert!(cli.validate().is_err());
    }
}
