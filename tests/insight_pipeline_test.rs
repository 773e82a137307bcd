use chrono::{Duration, TimeZone, Utc};
use finrl_insight::application::cache::ResultCache;
use finrl_insight::application::insight_service::{
    InsightService, MIN_HISTORY_BARS, ServiceSettings,
};
use finrl_insight::application::market_data::OBSERVATION_DIM;
use finrl_insight::application::ml::PolicyHandle;
use finrl_insight::application::simulation::ActionMapping;
use finrl_insight::domain::errors::{InsightError, InsightResult};
use finrl_insight::domain::performance::stats::round_to;
use finrl_insight::domain::ports::TradingPolicy;
use finrl_insight::domain::results::ResultKind;
use finrl_insight::infrastructure::mock::{ManualClock, MockMarketDataProvider};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// --- Fixed-action policy ---
struct ConstantPolicy(f32);

impl TradingPolicy for ConstantPolicy {
    fn act(&self, _observation: &[f32]) -> InsightResult<f32> {
        Ok(self.0)
    }
    fn observation_dim(&self) -> usize {
        OBSERVATION_DIM
    }
    fn name(&self) -> &str {
        "constant"
    }
}

struct Harness {
    service: InsightService,
    provider: Arc<MockMarketDataProvider>,
    cache: ResultCache,
}

fn harness(policy: PolicyHandle, settings: ServiceSettings) -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 3, 21, 0, 0).unwrap(),
    ));
    let provider = Arc::new(MockMarketDataProvider::new());
    let cache = ResultCache::new(std::time::Duration::from_secs(3600), clock.clone());
    let service = InsightService::new(
        provider.clone(),
        Arc::new(policy),
        cache.clone(),
        clock,
        settings,
    );
    Harness {
        service,
        provider,
        cache,
    }
}

fn constant(action: f32) -> PolicyHandle {
    PolicyHandle::ready(Arc::new(ConstantPolicy(action)))
}

#[tokio::test]
async fn test_prediction_shape_and_projection() {
    // Enough cash that the final buy always executes in full.
    let settings = ServiceSettings {
        mapping: ActionMapping {
            initial_amount: 1e12,
            ..ActionMapping::default()
        },
        ..ServiceSettings::default()
    };
    let h = harness(constant(0.5), settings);
    let result = h.service.predict(" aapl ").await.unwrap();

    assert_eq!(result.symbol, "AAPL");
    assert_eq!(result.price_history.len(), 240);

    let last = result.price_history.last().unwrap();
    assert_eq!(last.value, result.latest_close);
    assert_eq!(result.prediction_point.date, last.date + Duration::days(1));

    let expected = round_to(result.latest_close * (1.0 + 0.5_f64.tanh() * 0.01), 4);
    assert_eq!(result.predicted_next_close, expected);
    assert_eq!(result.prediction_point.predicted_close, expected);
    assert!((result.delta - (expected - result.latest_close)).abs() < 1e-12);
}

#[tokio::test]
async fn test_repeated_prediction_is_served_from_cache() {
    let h = harness(constant(0.5), ServiceSettings::default());
    let first = h.service.predict("AAPL").await.unwrap();
    let second = h.service.predict("aapl").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(h.provider.request_count(), 1);
    assert!(h.cache.get("AAPL", ResultKind::Prediction).is_some());
    assert!(h.cache.get("AAPL", ResultKind::Backtest).is_none());
}

#[tokio::test]
async fn test_backtest_over_holdout_window() {
    let h = harness(constant(0.3), ServiceSettings::default());
    let result = h.service.backtest("MSFT").await.unwrap();

    let curve = &result.equity_curve;
    assert!(!curve.is_empty());
    assert_eq!(curve.len(), result.price_comparison.len());
    assert_eq!(curve[0].equity, 100_000.0);

    let last_date = curve.last().unwrap().date;
    let split = last_date - Duration::days(60);
    assert!(curve.iter().all(|p| p.date >= split));
    assert!(curve.windows(2).all(|w| w[0].date < w[1].date));

    let first_row = result.price_comparison[0];
    let expected = first_row.actual_close * (1.0 + 0.3_f64.tanh() * 0.01);
    assert!((first_row.predicted_close - expected).abs() < 1e-9);

    assert!(result.metrics.max_drawdown_pct <= 0.0);
    assert_eq!(
        result.metrics.final_equity,
        round_to(curve.last().unwrap().equity, 2)
    );
}

#[tokio::test]
async fn test_hold_policy_backtest_is_flat() {
    let h = harness(constant(0.0), ServiceSettings::default());
    let result = h.service.backtest("IBM").await.unwrap();

    assert!(result.equity_curve.iter().all(|p| p.equity == 100_000.0));
    assert_eq!(result.metrics.total_return_pct, 0.0);
    assert_eq!(result.metrics.sharpe_ratio, 0.0);
    assert_eq!(result.metrics.max_drawdown_pct, 0.0);
}

#[tokio::test]
async fn test_invalid_symbol_never_reaches_provider() {
    let h = harness(constant(0.0), ServiceSettings::default());
    let err = h.service.predict("AA PL").await.unwrap_err();

    assert!(matches!(err, InsightError::InvalidSymbol { .. }));
    assert_eq!(h.provider.request_count(), 0);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_test_window_longer_than_history() {
    let settings = ServiceSettings {
        test_window_days: 700,
        ..ServiceSettings::default()
    };
    let h = harness(constant(0.0), settings);
    let err = h.service.backtest("AAPL").await.unwrap_err();

    match err {
        InsightError::InvalidWindow(message) => {
            assert!(message.starts_with("Not enough rows to create training and testing windows"))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn test_short_lookback_is_insufficient() {
    let settings = ServiceSettings {
        lookback: Duration::days(30),
        ..ServiceSettings::default()
    };
    let h = harness(constant(0.0), settings);
    let err = h.service.predict("AAPL").await.unwrap_err();
    assert!(matches!(err, InsightError::InsufficientData { .. }));
}

#[tokio::test]
async fn test_history_below_minimum_rows_is_insufficient() {
    // About 85 weekday bars: past the indicator warm-up, short of the minimum.
    let settings = ServiceSettings {
        lookback: Duration::days(120),
        ..ServiceSettings::default()
    };
    let h = harness(constant(0.0), settings);
    let err = h.service.predict("AAPL").await.unwrap_err();
    assert!(matches!(
        err,
        InsightError::InsufficientData {
            required: MIN_HISTORY_BARS,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unavailable_model_is_retried_per_request() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let policy = PolicyHandle::lazy(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(InsightError::ModelUnavailable(
            "ONNX model file not found".to_string(),
        ))
    });
    let h = harness(policy, ServiceSettings::default());

    for _ in 0..2 {
        let err = h.service.backtest("AAPL").await.unwrap_err();
        assert!(matches!(err, InsightError::ModelUnavailable(_)));
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(h.cache.is_empty());
}
