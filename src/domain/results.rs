//! Immutable payloads produced by the prediction and backtest pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: DateTime<Utc>,
    pub predicted_close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: String,
    pub latest_close: f64,
    pub predicted_next_close: f64,
    pub delta: f64,
    pub delta_pct: f64,
    pub generated_at: DateTime<Utc>,
    pub price_history: Vec<PricePoint>,
    pub prediction_point: PredictionPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceComparisonRow {
    pub date: DateTime<Utc>,
    pub actual_close: f64,
    pub predicted_close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub equity_curve: Vec<EquityPoint>,
    pub price_comparison: Vec<PriceComparisonRow>,
    pub metrics: BacktestMetrics,
}

/// Which pipeline produced a cached payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    Prediction,
    Backtest,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKind::Prediction => write!(f, "prediction"),
            ResultKind::Backtest => write!(f, "backtest"),
        }
    }
}

/// Cached payload. Cloning only bumps a reference count.
#[derive(Debug, Clone, PartialEq)]
pub enum InsightPayload {
    Prediction(Arc<PredictionResult>),
    Backtest(Arc<BacktestResult>),
}

impl InsightPayload {
    pub fn into_prediction(self) -> Option<Arc<PredictionResult>> {
        match self {
            InsightPayload::Prediction(p) => Some(p),
            InsightPayload::Backtest(_) => None,
        }
    }

    pub fn into_backtest(self) -> Option<Arc<BacktestResult>> {
        match self {
            InsightPayload::Backtest(b) => Some(b),
            InsightPayload::Prediction(_) => None,
        }
    }
}

impl From<PredictionResult> for InsightPayload {
    fn from(result: PredictionResult) -> Self {
        InsightPayload::Prediction(Arc::new(result))
    }
}

impl From<BacktestResult> for InsightPayload {
    fn from(result: BacktestResult) -> Self {
        InsightPayload::Backtest(Arc::new(result))
    }
}
