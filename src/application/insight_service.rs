use crate::application::cache::ResultCache;
use crate::application::ml::PolicyHandle;
use crate::application::simulation::{ActionMapping, BacktestSimulator, NextDayPredictor};
use crate::config::Config;
use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::market::{PriceBar, normalize_symbol, sanitize_bars};
use crate::domain::ports::{Clock, MarketDataProvider};
use crate::domain::results::{BacktestResult, InsightPayload, PredictionResult, ResultKind};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Tunables for the prediction and backtest pipelines.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub mapping: ActionMapping,
    pub lookback: chrono::Duration,
    pub test_window_days: i64,
    pub history_points: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            mapping: ActionMapping::default(),
            lookback: chrono::Duration::days(730),
            test_window_days: 60,
            history_points: 240,
        }
    }
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mapping: config.model.action_mapping(),
            lookback: config.pipeline.lookback(),
            test_window_days: i64::from(config.pipeline.test_window_days),
            history_points: config.pipeline.history_points,
        }
    }
}

/// Fewest cleaned bars a fetch must yield before any pipeline runs.
pub const MIN_HISTORY_BARS: usize = 100;

/// Everything a computation needs, cheap to clone into a cache flight.
#[derive(Clone)]
struct Pipeline {
    provider: Arc<dyn MarketDataProvider>,
    policy: Arc<PolicyHandle>,
    clock: Arc<dyn Clock>,
    predictor: NextDayPredictor,
    simulator: BacktestSimulator,
    lookback: chrono::Duration,
}

impl Pipeline {
    async fn fetch(&self, symbol: &str) -> InsightResult<Vec<PriceBar>> {
        let end = self.clock.now();
        let start = end - self.lookback;
        let raw = self.provider.daily_bars(symbol, start, end).await?;
        let fetched = raw.len();
        let bars = sanitize_bars(raw);

        if bars.is_empty() {
            return Err(InsightError::data_unavailable(
                symbol,
                format!("no usable price data returned by {}", self.provider.name()),
            ));
        }
        if bars.len() < MIN_HISTORY_BARS {
            return Err(InsightError::InsufficientData {
                symbol: symbol.to_string(),
                required: MIN_HISTORY_BARS,
                available: bars.len(),
            });
        }
        if bars.len() < fetched {
            debug!(
                "InsightService: dropped {} malformed bars for {}",
                fetched - bars.len(),
                symbol
            );
        }
        Ok(bars)
    }

    async fn prediction(self, symbol: String) -> InsightResult<PredictionResult> {
        let bars = self.fetch(&symbol).await?;
        run_blocking(move || {
            let policy = self.policy.get()?;
            self.predictor
                .predict(&symbol, &bars, policy.as_ref(), self.clock.now())
        })
        .await
    }

    async fn backtest(self, symbol: String) -> InsightResult<BacktestResult> {
        let bars = self.fetch(&symbol).await?;
        run_blocking(move || {
            let policy = self.policy.get()?;
            self.simulator
                .run(&symbol, &bars, policy.as_ref(), self.clock.now())
        })
        .await
    }
}

/// Runs CPU-bound work (features, inference, simulation) off the async workers.
async fn run_blocking<T, F>(work: F) -> InsightResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> InsightResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| InsightError::Internal(format!("pipeline task failed: {}", e)))?
}

/// Cached entry point for predictions and backtests.
pub struct InsightService {
    pipeline: Pipeline,
    cache: ResultCache,
}

impl InsightService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        policy: Arc<PolicyHandle>,
        cache: ResultCache,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                provider,
                policy,
                clock,
                predictor: NextDayPredictor::new(settings.mapping, settings.history_points),
                simulator: BacktestSimulator::new(settings.mapping, settings.test_window_days),
                lookback: settings.lookback,
            },
            cache,
        }
    }

    pub async fn predict(&self, raw_symbol: &str) -> InsightResult<Arc<PredictionResult>> {
        let symbol = normalize_symbol(raw_symbol)?;
        let payload = self.cached(&symbol, ResultKind::Prediction).await?;
        payload
            .into_prediction()
            .ok_or_else(|| mismatched_payload(&symbol, ResultKind::Prediction))
    }

    pub async fn backtest(&self, raw_symbol: &str) -> InsightResult<Arc<BacktestResult>> {
        let symbol = normalize_symbol(raw_symbol)?;
        let payload = self.cached(&symbol, ResultKind::Backtest).await?;
        payload
            .into_backtest()
            .ok_or_else(|| mismatched_payload(&symbol, ResultKind::Backtest))
    }

    async fn cached(&self, symbol: &str, kind: ResultKind) -> InsightResult<InsightPayload> {
        let pipeline = self.pipeline.clone();
        let owned = symbol.to_string();

        self.cache
            .get_or_compute(symbol, kind, move || async move {
                let started = Instant::now();
                let payload: InsightPayload = match kind {
                    ResultKind::Prediction => pipeline.prediction(owned.clone()).await?.into(),
                    ResultKind::Backtest => pipeline.backtest(owned.clone()).await?.into(),
                };
                info!(
                    "InsightService: computed {} for {} in {:?}",
                    kind,
                    owned,
                    started.elapsed()
                );
                Ok(payload)
            })
            .await
    }
}

fn mismatched_payload(symbol: &str, kind: ResultKind) -> InsightError {
    InsightError::Internal(format!(
        "cache returned a mismatched payload for {} {}",
        kind, symbol
    ))
}

impl std::fmt::Debug for InsightService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightService")
            .field("provider", &self.pipeline.provider.name())
            .field("cache", &self.cache)
            .finish()
    }
}
