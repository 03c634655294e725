use crate::core::rate_cache::RateCache;
use crate::domain::ports::{Clock, RateProvider, SettingsStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Refreshes `cache` now and then every `period` until the handle is aborted.
pub fn spawn_refresh_loop<P, S, C>(cache: Arc<RateCache<P, S, C>>, period: Duration) -> JoinHandle<()>
where
    P: RateProvider + 'static,
    S: SettingsStore + 'static,
    C: Clock + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let outcome = cache.refresh().await;
            tracing::debug!("Scheduled rate refresh: {:?}", outcome);
        }
    })
}
