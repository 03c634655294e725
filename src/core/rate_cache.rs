use crate::domain::model::RateTable;
use crate::domain::ports::{keys, Clock, RateProvider, RateSource, SettingsStore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Rates were fetched less than one TTL ago.
    Fresh,
    NoApiKey,
    Updated { currencies: usize },
    Failed { reason: String },
}

#[derive(Debug, Default)]
struct CacheState {
    live: RateTable,
    last_fetch_ms: i64,
}

/// USD-based exchange rates with a time-to-live, persisted through a
/// [`SettingsStore`] and backed by a static table.
///
/// The state lock is never held across the provider request, so two refreshes
/// racing past the TTL check both fetch; the later one wins.
pub struct RateCache<P: RateProvider, S: SettingsStore, C: Clock> {
    provider: P,
    store: S,
    clock: C,
    ttl: Duration,
    fallback: RateTable,
    default_api_key: Option<String>,
    state: RwLock<CacheState>,
}

impl<P: RateProvider, S: SettingsStore, C: Clock> RateCache<P, S, C> {
    pub fn new(provider: P, store: S, clock: C) -> Self {
        Self {
            provider,
            store,
            clock,
            ttl: CACHE_TTL,
            fallback: RateTable::fallback(),
            default_api_key: None,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Key used when the store holds none.
    pub fn with_default_api_key(mut self, api_key: Option<String>) -> Self {
        self.default_api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adopts rates persisted by an earlier run. Returns whether anything was loaded.
    pub async fn load_persisted(&self) -> bool {
        let rates = self.store.get(keys::EXCHANGE_RATES).await;
        let fetched_at = self.store.get(keys::LAST_FETCH_TIME).await;

        let (rates, fetched_at) = match (rates, fetched_at) {
            (Ok(Some(rates)), Ok(Some(fetched_at))) => (rates, fetched_at),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Could not read cached exchange rates: {}", e);
                return false;
            }
            _ => return false,
        };

        let Some(fetched_at) = epoch_millis(&fetched_at) else {
            tracing::warn!("Ignoring cached rates with bad timestamp: {}", fetched_at);
            return false;
        };

        let rates: HashMap<String, f64> = match serde_json::from_value(rates) {
            Ok(rates) => rates,
            Err(e) => {
                tracing::warn!("Ignoring malformed cached exchange rates: {}", e);
                return false;
            }
        };

        let mut state = self.write_state();
        state.live = RateTable::from_feed(rates);
        state.last_fetch_ms = fetched_at;
        tracing::info!("Loaded {} cached exchange rates", state.live.len());
        true
    }

    async fn api_key(&self) -> Option<String> {
        match self.store.get(keys::API_KEY).await {
            Ok(Some(Value::String(key))) if !key.trim().is_empty() => Some(key.trim().to_string()),
            Ok(_) => self.default_api_key.clone(),
            Err(e) => {
                tracing::warn!("Could not read API key from settings: {}", e);
                self.default_api_key.clone()
            }
        }
    }

    fn is_fresh_at(&self, now: i64) -> bool {
        let last = self.read_state().last_fetch_ms;
        now.saturating_sub(last) < self.ttl.as_millis() as i64
    }

    /// Fetches new rates unless the current ones are younger than the TTL.
    /// Failures are logged and leave the current table in place.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(api_key) = self.api_key().await else {
            tracing::warn!("No API key configured");
            return RefreshOutcome::NoApiKey;
        };

        let now = self.clock.now_millis();
        if self.is_fresh_at(now) {
            tracing::debug!("Using cached exchange rates");
            return RefreshOutcome::Fresh;
        }

        let response = match self.provider.latest(&api_key).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error fetching exchange rates: {}", e);
                return RefreshOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if !response.is_success() {
            let reason = response
                .error_type
                .unwrap_or_else(|| format!("result={}", response.result));
            tracing::warn!("Failed to fetch rates, using fallback: {}", reason);
            return RefreshOutcome::Failed { reason };
        }

        let table = RateTable::from_feed(response.conversion_rates);
        let currencies = table.len();
        let persisted = serde_json::to_value(&table);

        {
            let mut state = self.write_state();
            state.live = table;
            state.last_fetch_ms = now;
        }
        tracing::info!("Updated {} conversion rates", currencies);

        match persisted {
            Ok(rates) => {
                let entries = vec![(keys::EXCHANGE_RATES, rates), (keys::LAST_FETCH_TIME, json!(now))];
                if let Err(e) = self.store.set_many(entries).await {
                    tracing::warn!("Could not persist exchange rates: {}", e);
                }
            }
            Err(e) => tracing::warn!("Could not serialize exchange rates: {}", e),
        }

        RefreshOutcome::Updated { currencies }
    }

    /// Live rate, else the static fallback.
    pub fn get(&self, code: &str) -> Option<f64> {
        self.read_state()
            .live
            .get(code)
            .or_else(|| self.fallback.get(code))
    }

    /// Live table (possibly empty) and the epoch millis it was fetched at.
    pub fn snapshot(&self) -> (RateTable, i64) {
        let state = self.read_state();
        (state.live.clone(), state.last_fetch_ms)
    }
}

impl<P: RateProvider, S: SettingsStore, C: Clock> RateSource for RateCache<P, S, C> {
    fn rate(&self, code: &str) -> Option<f64> {
        self.get(code)
    }
}

fn epoch_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ManualClock, MemoryStore};
    use crate::domain::model::LatestRatesResponse;
    use crate::utils::error::{ConverterError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[derive(Clone)]
    struct StubProvider {
        calls: Arc<AtomicUsize>,
        body: std::result::Result<&'static str, &'static str>,
    }

    impl StubProvider {
        fn ok(body: &'static str) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                body: Ok(body),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                body: Err("connection refused"),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for StubProvider {
        async fn latest(&self, _api_key: &str) -> Result<LatestRatesResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Ok(body) => Ok(serde_json::from_str(body)?),
                Err(msg) => Err(ConverterError::ConfigError {
                    message: msg.to_string(),
                }),
            }
        }
    }

    const SUCCESS: &str = r#"{"result":"success","conversion_rates":{"USD":1,"EUR":0.5,"CHF":0.88}}"#;

    async fn store_with_key() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .set_many(vec![(keys::API_KEY, json!("0123456789abcdef01234567"))])
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_get_uses_fallback_before_first_fetch() {
        let cache = RateCache::new(StubProvider::ok(SUCCESS), MemoryStore::new(), ManualClock::new(0));
        assert_eq!(cache.get("EUR"), Some(0.92));
        assert_eq!(cache.get("USD"), Some(1.0));
        assert_eq!(cache.get("CHF"), None);
    }

    #[tokio::test]
    async fn test_refresh_twice_within_ttl_fetches_once() {
        let provider = StubProvider::ok(SUCCESS);
        let clock = ManualClock::new(10 * HOUR_MS);
        let cache = RateCache::new(provider.clone(), store_with_key().await, clock.clone());

        assert_eq!(cache.refresh().await, RefreshOutcome::Updated { currencies: 3 });
        clock.advance(HOUR_MS - 1);
        assert_eq!(cache.refresh().await, RefreshOutcome::Fresh);
        assert_eq!(provider.calls(), 1);

        clock.advance(1);
        assert_eq!(cache.refresh().await, RefreshOutcome::Updated { currencies: 3 });
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_successful_refresh_replaces_table_and_persists() {
        let store = store_with_key().await;
        let clock = ManualClock::new(5 * HOUR_MS);
        let cache = RateCache::new(StubProvider::ok(SUCCESS), store.clone(), clock);

        cache.refresh().await;

        assert_eq!(cache.get("EUR"), Some(0.5));
        assert_eq!(cache.get("CHF"), Some(0.88));
        // not in the live table, still served from the fallback
        assert_eq!(cache.get("GBP"), Some(0.79));

        let saved = store.snapshot().await;
        assert_eq!(saved[keys::LAST_FETCH_TIME], json!(5 * HOUR_MS));
        assert_eq!(saved[keys::EXCHANGE_RATES]["EUR"], json!(0.5));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_table() {
        let store = store_with_key().await;
        let clock = ManualClock::new(3 * HOUR_MS);
        let ok = RateCache::new(StubProvider::ok(SUCCESS), store.clone(), clock.clone());
        ok.refresh().await;

        let provider = StubProvider::failing();
        let cache = RateCache::new(provider.clone(), store, clock.clone());
        assert!(cache.load_persisted().await);
        clock.advance(2 * HOUR_MS);

        let outcome = cache.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.get("EUR"), Some(0.5));
    }

    #[tokio::test]
    async fn test_rejected_response_is_failure() {
        let provider = StubProvider::ok(r#"{"result":"error","error-type":"invalid-key"}"#);
        let cache = RateCache::new(provider, store_with_key().await, ManualClock::new(2 * HOUR_MS));

        assert_eq!(
            cache.refresh().await,
            RefreshOutcome::Failed {
                reason: "invalid-key".to_string()
            }
        );
        assert_eq!(cache.get("EUR"), Some(0.92));
        assert_eq!(cache.snapshot().1, 0);
    }

    #[tokio::test]
    async fn test_no_api_key_skips_request() {
        let provider = StubProvider::ok(SUCCESS);
        let cache = RateCache::new(provider.clone(), MemoryStore::new(), ManualClock::new(2 * HOUR_MS));

        assert_eq!(cache.refresh().await, RefreshOutcome::NoApiKey);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_default_api_key_used_when_store_has_none() {
        let provider = StubProvider::ok(SUCCESS);
        let cache = RateCache::new(provider.clone(), MemoryStore::new(), ManualClock::new(2 * HOUR_MS))
            .with_default_api_key(Some("from-config".to_string()));

        assert_eq!(cache.refresh().await, RefreshOutcome::Updated { currencies: 3 });
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_persisted_rates_fresh_until_ttl() {
        let now = 100 * HOUR_MS;
        let store = store_with_key().await;
        store
            .set_many(vec![
                (keys::EXCHANGE_RATES, json!({"EUR": 0.91})),
                (keys::LAST_FETCH_TIME, json!(now)),
            ])
            .await
            .unwrap();

        let provider = StubProvider::ok(SUCCESS);
        let clock = ManualClock::new(now);
        let cache = RateCache::new(provider.clone(), store, clock.clone());

        assert!(cache.load_persisted().await);
        assert_eq!(cache.get("EUR"), Some(0.91));
        assert_eq!(cache.refresh().await, RefreshOutcome::Fresh);
        assert_eq!(provider.calls(), 0);

        clock.set(now + HOUR_MS);
        cache.refresh().await;
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.get("EUR"), Some(0.5));
    }

    #[tokio::test]
    async fn test_extreme_persisted_timestamp_counts_as_stale() {
        let store = store_with_key().await;
        store
            .set_many(vec![
                (keys::EXCHANGE_RATES, json!({"EUR": 0.91})),
                (keys::LAST_FETCH_TIME, json!(i64::MIN)),
            ])
            .await
            .unwrap();

        let provider = StubProvider::ok(SUCCESS);
        let cache = RateCache::new(provider.clone(), store, ManualClock::new(100 * HOUR_MS));

        assert!(cache.load_persisted().await);
        assert_eq!(cache.refresh().await, RefreshOutcome::Updated { currencies: 3 });
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.get("EUR"), Some(0.5));
    }

    #[tokio::test]
    async fn test_load_persisted_needs_both_keys() {
        let store = MemoryStore::new();
        store
            .set_many(vec![(keys::EXCHANGE_RATES, json!({"EUR": 0.91}))])
            .await
            .unwrap();
        let cache = RateCache::new(StubProvider::ok(SUCCESS), store, ManualClock::new(0));

        assert!(!cache.load_persisted().await);
        assert_eq!(cache.get("EUR"), Some(0.92));
    }
}
