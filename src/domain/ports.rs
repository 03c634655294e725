use crate::domain::model::LatestRatesResponse;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Keys used in the persisted settings store.
pub mod keys {
    pub const TARGET_CURRENCY: &str = "targetCurrency";
    pub const VAT_RATE: &str = "vatRate";
    pub const API_KEY: &str = "apiKey";
    pub const EXCHANGE_RATES: &str = "exchangeRates";
    pub const LAST_FETCH_TIME: &str = "lastFetchTime";
    pub const LAST_VALIDATION_TIME: &str = "lastValidationTime";
    pub const LAST_VALIDATED_KEY: &str = "lastValidatedKey";
}

/// Key/value persistence owned by the host (extension storage, a file, ...).
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<Value>>> + Send;
    fn set_many(
        &self,
        entries: Vec<(&'static str, Value)>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Latest USD-based rates. Non-success bodies are returned as-is;
    /// only transport and decoding failures are errors.
    async fn latest(&self, api_key: &str) -> Result<LatestRatesResponse>;
}

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Anything that can answer "how many units of `code` buy one US dollar".
pub trait RateSource {
    fn rate(&self, code: &str) -> Option<f64>;
}

impl RateSource for crate::domain::model::RateTable {
    fn rate(&self, code: &str) -> Option<f64> {
        self.get(code)
    }
}
