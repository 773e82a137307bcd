use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::market::PriceBar;
use crate::domain::ports::{Clock, MarketDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Synthetic daily bars: a seeded random walk on weekdays.
///
/// The same symbol and window always produce the same bars.
#[derive(Debug, Default)]
pub struct MockMarketDataProvider {
    requests: AtomicUsize,
}

impl MockMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `daily_bars` calls served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn generate(symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<PriceBar> {
        let mut rng = StdRng::seed_from_u64(symbol_seed(symbol));
        let mut close: f64 = rng.random_range(20.0..400.0);
        let drift: f64 = rng.random_range(-0.0005..0.001);

        let mut day = start.date_naive();
        let last = end.date_naive();
        let mut bars = Vec::new();

        while day <= last {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                let open = close;
                let change: f64 = drift + rng.random_range(-0.02..0.02);
                close = (open * (1.0 + change)).max(0.01);
                let spread = open.max(close) * rng.random_range(0.0..0.01);
                bars.push(PriceBar {
                    date: Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap_or_default()),
                    open,
                    high: open.max(close) + spread,
                    low: (open.min(close) - spread).max(0.005),
                    close,
                    volume: rng.random_range(500_000.0..5_000_000.0_f64).round(),
                });
            }
            day += Duration::days(1);
        }
        bars
    }
}

/// FNV-1a over the symbol bytes.
fn symbol_seed(symbol: &str) -> u64 {
    symbol.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> InsightResult<Vec<PriceBar>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let bars = Self::generate(symbol, start, end);
        if bars.is_empty() {
            return Err(InsightError::data_unavailable(
                symbol,
                "No price data returned for ticker",
            ));
        }
        debug!("MockMarketDataProvider: {} bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

/// Clock moved by hand, for TTL tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(at) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        match self.now.lock() {
            Ok(mut guard) => *guard = at,
            Err(poisoned) => *poisoned.into_inner() = at,
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_bars_are_deterministic_weekdays() {
        let provider = MockMarketDataProvider::new();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(27);

        let first = provider.daily_bars("AAPL", start, end).await.unwrap();
        let second = provider.daily_bars("AAPL", start, end).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 20);
        assert!(first.iter().all(|b| b.is_well_formed()));
        assert!(first.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(provider.request_count(), 2);
    }

    #[test]
    fn test_symbols_get_distinct_series() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(10);
        assert_ne!(
            MockMarketDataProvider::generate("AAPL", start, end),
            MockMarketDataProvider::generate("MSFT", start, end)
        );
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::default();
        let t0 = clock.now();
        clock.advance(Duration::minutes(61));
        assert_eq!(clock.now() - t0, Duration::minutes(61));
    }
}
