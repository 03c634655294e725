// Adapters layer: concrete implementations of the domain ports.

pub mod clock;
pub mod http;
pub mod storage;

pub use clock::{ManualClock, SystemClock};
pub use http::{ExchangeRateApiClient, DEFAULT_BASE_URL};
pub use storage::{JsonFileStore, MemoryStore};
