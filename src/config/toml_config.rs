use crate::adapters::http::DEFAULT_BASE_URL;
use crate::core::session::DEFAULT_BREAKDOWN_HOST;
use crate::domain::model::Settings;
use crate::utils::error::{ConverterError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_STORE_PATH: &str = "./currency-lens-state.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub site: SiteConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_minutes: u64,
    pub store_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 60,
            store_path: DEFAULT_STORE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub breakdown_host: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            breakdown_host: DEFAULT_BREAKDOWN_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub target_currency: String,
    pub vat_rate: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            target_currency: settings.target_currency,
            vat_rate: settings.vat_rate,
        }
    }
}

impl AppConfig {
    /// Loads the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConverterError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| ConverterError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        // an unset ${VAR} stays literal; treat it as no key at all
        if let Some(key) = &config.provider.api_key {
            if key.trim().is_empty() || key.starts_with("${") {
                tracing::debug!("provider.api_key is not set");
                config.provider.api_key = None;
            }
        }

        Ok(config)
    }

    /// Replaces `${VAR}` references (e.g. `${EXCHANGE_API_KEY}`) with environment values.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_seconds)
    }

    pub fn default_settings(&self) -> Settings {
        Settings {
            target_currency: self.defaults.target_currency.clone(),
            vat_rate: self.defaults.vat_rate,
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("provider.base_url", &self.provider.base_url)?;
        validate_positive_number("provider.timeout_seconds", self.provider.timeout_seconds, 1)?;
        validate_positive_number("cache.ttl_minutes", self.cache.ttl_minutes, 1)?;
        validate_path("cache.store_path", &self.cache.store_path)?;
        validate_non_empty_string("site.breakdown_host", &self.site.breakdown_host)?;
        self.default_settings().validate()
    }
}
