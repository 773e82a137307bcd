use crate::domain::errors::InsightResult;
use crate::domain::market::PriceBar;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of daily OHLCV history.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `symbol` between `start` and `end`, oldest first.
    async fn daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> InsightResult<Vec<PriceBar>>;

    fn name(&self) -> &str;
}

/// A pretrained trading policy. Inference only.
pub trait TradingPolicy: Send + Sync {
    /// Maps one observation to a continuous action in `[-1, 1]`.
    fn act(&self, observation: &[f32]) -> InsightResult<f32>;

    /// Length of the observation vector the policy was trained with.
    fn observation_dim(&self) -> usize;

    fn name(&self) -> &str;
}

/// Wall-clock source for TTL bookkeeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
