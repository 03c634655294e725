use crate::domain::ports::{keys, Clock, RateProvider, SettingsStore};
use serde_json::{json, Value};
use std::time::Duration;

pub const API_KEY_LENGTH: usize = 24;
pub const VALIDATION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Empty,
    WrongLength,
    Valid,
    Invalid,
}

impl KeyStatus {
    pub fn message(&self) -> &'static str {
        match self {
            KeyStatus::Empty => "",
            KeyStatus::WrongLength => "API key must be 24 characters",
            KeyStatus::Valid => "API key is valid",
            KeyStatus::Invalid => "Invalid API key",
        }
    }
}

/// Checks API keys against the rate provider, remembering a successful
/// check of the same key for one hour.
pub struct KeyValidator<'a, P: RateProvider, S: SettingsStore, C: Clock> {
    provider: &'a P,
    store: &'a S,
    clock: &'a C,
    ttl: Duration,
}

impl<'a, P: RateProvider, S: SettingsStore, C: Clock> KeyValidator<'a, P, S, C> {
    pub fn new(provider: &'a P, store: &'a S, clock: &'a C) -> Self {
        Self {
            provider,
            store,
            clock,
            ttl: VALIDATION_TTL,
        }
    }

    /// Shape check, then [`Self::validate`].
    pub async fn check(&self, api_key: &str) -> KeyStatus {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return KeyStatus::Empty;
        }
        if api_key.chars().count() != API_KEY_LENGTH {
            return KeyStatus::WrongLength;
        }

        if self.validate(api_key).await {
            KeyStatus::Valid
        } else {
            KeyStatus::Invalid
        }
    }

    pub async fn validate(&self, api_key: &str) -> bool {
        let now = self.clock.now_millis();

        if self.recently_validated(api_key, now).await {
            tracing::debug!("Using cached API key validation");
            return true;
        }

        match self.provider.latest(api_key).await {
            Ok(response) if response.is_success() => {
                let entries = vec![
                    (keys::LAST_VALIDATION_TIME, json!(now)),
                    (keys::LAST_VALIDATED_KEY, json!(api_key)),
                ];
                if let Err(e) = self.store.set_many(entries).await {
                    tracing::warn!("Could not persist key validation: {}", e);
                }
                true
            }
            Ok(response) => {
                tracing::debug!(
                    "API key rejected: {}",
                    response.error_type.as_deref().unwrap_or("unknown")
                );
                false
            }
            Err(e) => {
                tracing::warn!("API key validation failed: {}", e);
                false
            }
        }
    }

    async fn recently_validated(&self, api_key: &str, now: i64) -> bool {
        let time = self.store.get(keys::LAST_VALIDATION_TIME).await.ok().flatten();
        let key = self.store.get(keys::LAST_VALIDATED_KEY).await.ok().flatten();

        match (time.as_ref().and_then(Value::as_i64), key) {
            (Some(validated_at), Some(Value::String(key))) => {
                key == api_key && now.saturating_sub(validated_at) < self.ttl.as_millis() as i64
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ManualClock, MemoryStore};
    use crate::domain::model::LatestRatesResponse;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "0123456789abcdef01234567";

    struct CountingProvider {
        success: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateProvider for CountingProvider {
        async fn latest(&self, _api_key: &str) -> Result<LatestRatesResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = if self.success {
                r#"{"result":"success","conversion_rates":{"USD":1}}"#
            } else {
                r#"{"result":"error","error-type":"invalid-key"}"#
            };
            Ok(serde_json::from_str(body)?)
        }
    }

    fn provider(success: bool) -> CountingProvider {
        CountingProvider {
            success,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_shape_checks_skip_the_network() {
        let p = provider(true);
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let validator = KeyValidator::new(&p, &store, &clock);

        assert_eq!(validator.check("   ").await, KeyStatus::Empty);
        assert_eq!(validator.check("short").await, KeyStatus::WrongLength);
        assert_eq!(KeyStatus::WrongLength.message(), "API key must be 24 characters");
        assert_eq!(p.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_key_is_cached_for_an_hour() {
        let p = provider(true);
        let store = MemoryStore::new();
        let clock = ManualClock::new(1_000);
        let validator = KeyValidator::new(&p, &store, &clock);

        assert_eq!(validator.check(KEY).await, KeyStatus::Valid);
        clock.advance(30 * 60 * 1000);
        assert_eq!(validator.check(KEY).await, KeyStatus::Valid);
        assert_eq!(p.calls.load(Ordering::SeqCst), 1);

        clock.advance(30 * 60 * 1000);
        assert_eq!(validator.check(KEY).await, KeyStatus::Valid);
        assert_eq!(p.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            store.get(keys::LAST_VALIDATION_TIME).await.unwrap(),
            Some(json!(1_000 + 60 * 60 * 1000))
        );
    }

    #[tokio::test]
    async fn test_cache_does_not_cover_a_different_key() {
        let p = provider(true);
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let validator = KeyValidator::new(&p, &store, &clock);

        validator.validate(KEY).await;
        validator.validate("abcdefabcdefabcdefabcdef").await;
        assert_eq!(p.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_extreme_validation_timestamp_is_not_trusted() {
        let p = provider(true);
        let store = MemoryStore::new();
        store
            .set_many(vec![
                (keys::LAST_VALIDATION_TIME, json!(i64::MIN)),
                (keys::LAST_VALIDATED_KEY, json!(KEY)),
            ])
            .await
            .unwrap();
        let clock = ManualClock::new(5_000);
        let validator = KeyValidator::new(&p, &store, &clock);

        assert!(validator.validate(KEY).await);
        assert_eq!(p.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(keys::LAST_VALIDATION_TIME).await.unwrap(), Some(json!(5_000)));
    }

    #[tokio::test]
    async fn test_rejected_key_is_invalid_and_not_cached() {
        let p = provider(false);
        let store = MemoryStore::new();
        let clock = ManualClock::new(0);
        let validator = KeyValidator::new(&p, &store, &clock);

        assert_eq!(validator.check(KEY).await, KeyStatus::Invalid);
        assert_eq!(validator.check(KEY).await, KeyStatus::Invalid);
        assert_eq!(p.calls.load(Ordering::SeqCst), 2);
        assert!(store.snapshot().await.is_empty());
    }
}
