//! Request and response bodies.

use crate::domain::results::{BacktestResult, PredictionResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DISCLAIMER: &str =
    "Educational use only. These FinRL-driven simulations are NOT financial advice.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRequest {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub disclaimer: String,
}

impl From<Arc<PredictionResult>> for PredictionResponse {
    fn from(result: Arc<PredictionResult>) -> Self {
        Self {
            result: Arc::unwrap_or_clone(result),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResponse {
    #[serde(flatten)]
    pub result: BacktestResult,
    pub disclaimer: String,
}

impl From<Arc<BacktestResult>> for BacktestResponse {
    fn from(result: Arc<BacktestResult>) -> Self {
        Self {
            result: Arc::unwrap_or_clone(result),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::results::BacktestMetrics;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_backtest_response_is_flat() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let response = BacktestResponse::from(Arc::new(BacktestResult {
            symbol: "AAPL".to_string(),
            generated_at: at,
            equity_curve: Vec::new(),
            price_comparison: Vec::new(),
            metrics: BacktestMetrics::default(),
        }));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["symbol"], "AAPL");
        assert_eq!(value["disclaimer"], DISCLAIMER);
        assert_eq!(value["metrics"]["sharpe_ratio"], 0.0);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_symbol_request_parsing() {
        let request: SymbolRequest = serde_json::from_str(r#"{"symbol":" msft "}"#).unwrap();
        assert_eq!(request.symbol, " msft ");
        assert!(serde_json::from_str::<SymbolRequest>("{}").is_err());
    }
}
