use super::indicators::{ManualCci, ManualDx};
use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::market::PriceBar;
use ta::Next;
use ta::indicators::{
    BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};

/// Ordered indicator names.
/// This order MUST match the technical-indicator list the policy was trained on.
/// Any change here is a breaking change for exported models.
pub const INDICATOR_NAMES: &[&str] = &[
    "macd",
    "boll_ub",
    "boll_lb",
    "rsi_30",
    "cci_30",
    "dx_30",
    "close_30_sma",
    "close_60_sma",
];

/// Number of tickers per observation. The service trades one stock at a time.
pub const STOCK_DIM: usize = 1;

/// `[cash, close, shares_held, indicators...]`
pub const OBSERVATION_DIM: usize = 1 + 2 * STOCK_DIM + INDICATOR_NAMES.len() * STOCK_DIM;

/// Bars needed before every indicator has seen its full window.
pub const WARMUP_BARS: usize = 60;

const BOLL_PERIOD: usize = 20;

/// Technical features for one bar, computed from that bar and its predecessors only.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketFeatures {
    pub close: f64,
    pub macd: f64,
    pub boll_ub: f64,
    pub boll_lb: f64,
    pub rsi_30: f64,
    pub cci_30: f64,
    pub dx_30: f64,
    pub close_30_sma: f64,
    pub close_60_sma: f64,
}

impl MarketFeatures {
    /// Assembles the policy observation for this bar and the given holdings.
    pub fn observation(&self, cash: f64, shares_held: f64) -> Vec<f32> {
        [
            cash,
            self.close,
            shares_held,
            self.macd,
            self.boll_ub,
            self.boll_lb,
            self.rsi_30,
            self.cci_30,
            self.dx_30,
            self.close_30_sma,
            self.close_60_sma,
        ]
        .iter()
        .map(|&v| if v.is_finite() { v as f32 } else { 0.0 })
        .collect()
    }
}

/// Turns ordered price bars into per-bar market features.
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// One `MarketFeatures` per input bar. Only entries from index
    /// `WARMUP_BARS - 1` on have fully warmed-up indicators.
    pub fn build(symbol: &str, bars: &[PriceBar]) -> InsightResult<Vec<MarketFeatures>> {
        if bars.len() < WARMUP_BARS {
            return Err(InsightError::InsufficientData {
                symbol: symbol.to_string(),
                required: WARMUP_BARS,
                available: bars.len(),
            });
        }

        let setup = |e: ta::errors::TaError| {
            InsightError::Internal(format!("indicator setup failed: {:?}", e))
        };
        let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9).map_err(setup)?;
        let mut boll = BollingerBands::new(BOLL_PERIOD, 2.0).map_err(setup)?;
        let mut rsi = RelativeStrengthIndex::new(30).map_err(setup)?;
        let mut sma_30 = SimpleMovingAverage::new(30).map_err(setup)?;
        let mut sma_60 = SimpleMovingAverage::new(60).map_err(setup)?;
        let mut cci = ManualCci::new(30);
        let mut dx = ManualDx::new(30);

        let features = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let close = bar.close;
                let bands = boll.next(close);
                let width = (bands.upper - bands.average) * sample_std_factor(i + 1);
                MarketFeatures {
                    close,
                    macd: macd.next(close).macd,
                    boll_ub: bands.average + width,
                    boll_lb: bands.average - width,
                    rsi_30: rsi.next(close),
                    cci_30: cci.next(bar.high, bar.low, close),
                    dx_30: dx.next(bar.high, bar.low, close),
                    close_30_sma: sma_30.next(close),
                    close_60_sma: sma_60.next(close),
                }
            })
            .collect();

        Ok(features)
    }
}

/// Rescales the population deviation `ta` reports to the sample (n-1)
/// deviation the training features were computed with.
fn sample_std_factor(seen: usize) -> f64 {
    let n = seen.min(BOLL_PERIOD);
    if n < 2 {
        1.0
    } else {
        (n as f64 / (n - 1) as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(n: usize) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1;
                PriceBar {
                    date: start + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_observation_dim_matches_indicator_list() {
        assert_eq!(OBSERVATION_DIM, 11);
        let obs = MarketFeatures::default().observation(100_000.0, 0.0);
        assert_eq!(obs.len(), OBSERVATION_DIM);
        assert_eq!(obs[0], 100_000.0);
    }

    #[test]
    fn test_insufficient_bars_rejected() {
        let err = FeatureBuilder::build("AAPL", &bars(WARMUP_BARS - 1)).unwrap_err();
        assert!(matches!(
            err,
            InsightError::InsufficientData {
                required: WARMUP_BARS,
                available: 59,
                ..
            }
        ));
    }

    #[test]
    fn test_build_is_deterministic_and_aligned() {
        let input = bars(120);
        let first = FeatureBuilder::build("AAPL", &input).unwrap();
        let second = FeatureBuilder::build("AAPL", &input).unwrap();

        assert_eq!(first.len(), input.len());
        assert_eq!(first, second);

        let last = first.last().unwrap();
        assert_eq!(last.close, input.last().unwrap().close);
        assert!(last.boll_ub >= last.boll_lb);
        assert!((0.0..=100.0).contains(&last.rsi_30));
    }

    #[test]
    fn test_bollinger_bands_use_sample_std() {
        let input = bars(80);
        let features = FeatureBuilder::build("AAPL", &input).unwrap();

        let window: Vec<f64> = input[60..80].iter().map(|b| b.close).collect();
        let mean = window.iter().sum::<f64>() / 20.0;
        let var = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / 19.0;
        let last = features[79];
        assert!((last.boll_ub - (mean + 2.0 * var.sqrt())).abs() < 1e-9);
        assert!((last.boll_lb - (mean - 2.0 * var.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_sma_60_is_mean_of_last_60_closes() {
        let input = bars(90);
        let features = FeatureBuilder::build("AAPL", &input).unwrap();

        let expected = input[30..].iter().map(|b| b.close).sum::<f64>() / 60.0;
        assert!((features[89].close_60_sma - expected).abs() < 1e-9);
    }
}
