use crate::domain::model::LatestRatesResponse;
use crate::domain::ports::RateProvider;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Client for the exchangerate-api.com v6 `latest` endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeRateApiClient {
    client: Client,
    base_url: String,
}

impl ExchangeRateApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn latest_url(&self, api_key: &str) -> String {
        format!("{}/{}/latest/USD", self.base_url.trim_end_matches('/'), api_key)
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApiClient {
    async fn latest(&self, api_key: &str) -> Result<LatestRatesResponse> {
        // the key is part of the path, keep it out of the logs
        tracing::debug!("Requesting latest USD rates from {}", self.base_url);
        let response = self.client.get(self.latest_url(api_key)).send().await?;

        tracing::debug!("Rate provider response status: {}", response.status());

        // error bodies come with 4xx statuses, so decode regardless
        let body = response.text().await?;
        let parsed: LatestRatesResponse = serde_json::from_str(&body)?;
        Ok(parsed)
    }
}
