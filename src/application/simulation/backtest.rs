use super::action_mapping::ActionMapping;
use super::rollout::replay;
use crate::application::market_data::{FeatureBuilder, WARMUP_BARS};
use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::market::PriceBar;
use crate::domain::ports::TradingPolicy;
use crate::domain::results::{
    BacktestMetrics, BacktestResult, EquityPoint, PriceComparisonRow,
};
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

const NOT_ENOUGH_ROWS: &str = "Not enough rows to create training and testing windows. \
Reduce FINRL_TEST_WINDOW_DAYS or extend lookback.";
const EMPTY_DATASET: &str = "Empty training or testing dataset produced.";

/// Replays a policy over the most recent holdout window of a price series.
#[derive(Debug, Clone)]
pub struct BacktestSimulator {
    mapping: ActionMapping,
    test_window_days: i64,
}

impl BacktestSimulator {
    pub fn new(mapping: ActionMapping, test_window_days: i64) -> Self {
        Self {
            mapping,
            test_window_days,
        }
    }

    /// Holdout bars: dated on or after `last_date - test_window_days` and
    /// before the last date, which is excluded.
    pub fn holdout(&self, bars: &[PriceBar]) -> InsightResult<std::ops::Range<usize>> {
        let start = self.holdout_start(bars)?;
        let end = bars.len() - 1;
        if start >= end {
            return Err(InsightError::InvalidWindow(EMPTY_DATASET.to_string()));
        }
        Ok(start..end)
    }

    /// Index of the first bar dated on or after `last_date - test_window_days`.
    pub fn holdout_start(&self, bars: &[PriceBar]) -> InsightResult<usize> {
        let last = bars
            .last()
            .ok_or_else(|| InsightError::InvalidWindow(EMPTY_DATASET.to_string()))?;
        let split = last.date - Duration::days(self.test_window_days);
        let start = bars.partition_point(|bar| bar.date < split);

        if start < WARMUP_BARS - 1 {
            return Err(InsightError::InvalidWindow(NOT_ENOUGH_ROWS.to_string()));
        }
        if start >= bars.len() {
            return Err(InsightError::InvalidWindow(EMPTY_DATASET.to_string()));
        }
        Ok(start)
    }

    pub fn run(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        policy: &dyn TradingPolicy,
        generated_at: DateTime<Utc>,
    ) -> InsightResult<BacktestResult> {
        let features = FeatureBuilder::build(symbol, bars)?;
        let range = self.holdout(bars)?;
        let holdout = &bars[range.clone()];
        debug!(
            "BacktestSimulator: {} holdout bars for {} (split at index {})",
            holdout.len(),
            symbol,
            range.start
        );

        let rollout = replay(policy, &features[range], &self.mapping)?;

        let equity_curve = holdout
            .iter()
            .zip(&rollout.equity)
            .map(|(bar, &equity)| EquityPoint {
                date: bar.date,
                equity,
            })
            .collect();

        let price_comparison = self.comparison_rows(holdout, &rollout.actions);
        let metrics =
            BacktestMetrics::from_equity_curve(&rollout.equity, self.mapping.annualization_days);

        Ok(BacktestResult {
            symbol: symbol.to_string(),
            generated_at,
            equity_curve,
            price_comparison,
            metrics,
        })
    }

    /// One row per holdout bar. The projected close for bar `i` applies the
    /// signal of executed trade `i` to the previous actual close. The last bar has no
    /// action of its own and reuses the previous signal.
    fn comparison_rows(&self, holdout: &[PriceBar], actions: &[f64]) -> Vec<PriceComparisonRow> {
        let mut signal = 0.0;
        holdout
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                if let Some(&shares) = actions.get(i) {
                    signal = self.mapping.signal(shares);
                }
                let reference = if i == 0 {
                    bar.close
                } else {
                    holdout[i - 1].close
                };
                PriceComparisonRow {
                    date: bar.date,
                    actual_close: bar.close,
                    predicted_close: self.mapping.project_close(reference, signal),
                }
            })
            .collect()
    }
}
