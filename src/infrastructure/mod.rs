// HTTP client, retries and circuit breaking
pub mod core;

// Deterministic provider and clock for tests and offline runs
pub mod mock;

// Yahoo Finance chart API
pub mod yahoo;

pub use mock::{ManualClock, MockMarketDataProvider};
pub use yahoo::YahooFinanceClient;
