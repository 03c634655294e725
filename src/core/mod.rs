pub mod format;
pub mod key_validator;
pub mod price_calculator;
pub mod rate_cache;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod settings;

pub use crate::domain::model::{
    CartTotal, Overlay, PriceBreakdown, RateTable, SelectionMatch, Settings, SettingsMessage,
};
pub use crate::domain::ports::{Clock, RateProvider, RateSource, SettingsStore};
pub use crate::utils::error::Result;
