pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{ExchangeRateApiClient, JsonFileStore, ManualClock, MemoryStore, SystemClock};
pub use config::AppConfig;
pub use core::{
    key_validator::{KeyStatus, KeyValidator},
    rate_cache::{RateCache, RefreshOutcome},
    scheduler::spawn_refresh_loop,
    selection::SelectionMatcher,
    session::PageSession,
};
pub use utils::error::{ConverterError, Result};
