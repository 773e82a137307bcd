use super::action_mapping::ActionMapping;
use super::rollout::{act_on, replay};
use crate::application::market_data::{FeatureBuilder, WARMUP_BARS};
use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::market::PriceBar;
use crate::domain::performance::stats::round_to;
use crate::domain::ports::TradingPolicy;
use crate::domain::results::{PredictionPoint, PredictionResult, PricePoint};
use chrono::{DateTime, Duration, Utc};

/// Projects the next close from the policy's action on the latest bar.
#[derive(Debug, Clone)]
pub struct NextDayPredictor {
    mapping: ActionMapping,
    history_points: usize,
}

impl NextDayPredictor {
    pub fn new(mapping: ActionMapping, history_points: usize) -> Self {
        Self {
            mapping,
            history_points,
        }
    }

    /// Replays the policy from the first warmed-up bar so the account reflects
    /// the policy's own holdings, then acts once more on the latest bar. The
    /// signal comes from the shares that trade would execute at the latest close.
    pub fn predict(
        &self,
        symbol: &str,
        bars: &[PriceBar],
        policy: &dyn TradingPolicy,
        generated_at: DateTime<Utc>,
    ) -> InsightResult<PredictionResult> {
        let features = FeatureBuilder::build(symbol, bars)?;
        let (Some(latest_bar), Some(latest_features)) = (bars.last(), features.last()) else {
            return Err(InsightError::InsufficientData {
                symbol: symbol.to_string(),
                required: WARMUP_BARS,
                available: 0,
            });
        };

        let rollout = replay(policy, &features[WARMUP_BARS - 1..], &self.mapping)?;
        let requested = act_on(policy, latest_features, &rollout.account, &self.mapping)?;

        let latest_close = latest_bar.close;
        let mut account = rollout.account;
        let shares = account.execute(requested, latest_close, &self.mapping);
        let predicted_next_close = round_to(
            self.mapping
                .project_close(latest_close, self.mapping.signal(shares)),
            4,
        );
        let delta = predicted_next_close - latest_close;
        let delta_pct = if latest_close != 0.0 {
            delta / latest_close * 100.0
        } else {
            0.0
        };

        let history_start = bars.len().saturating_sub(self.history_points);
        let price_history = bars[history_start..]
            .iter()
            .map(|bar| PricePoint {
                date: bar.date,
                value: bar.close,
            })
            .collect();

        Ok(PredictionResult {
            symbol: symbol.to_string(),
            latest_close,
            predicted_next_close,
            delta,
            delta_pct,
            generated_at,
            price_history,
            prediction_point: PredictionPoint {
                date: latest_bar.date + Duration::days(1),
                predicted_close: predicted_next_close,
            },
        })
    }
}
