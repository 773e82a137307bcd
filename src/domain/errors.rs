use thiserror::Error;

/// Errors raised while producing a prediction or a backtest.
///
/// The type is `Clone` because a single in-flight computation hands the same
/// outcome to every request coalesced onto it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InsightError {
    #[error("Invalid symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("No market data returned for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Market data provider rate limit hit. Please wait a moment and try again.")]
    RateLimited,

    #[error("Insufficient historical data for {symbol}: need {required} bars, got {available}")]
    InsufficientData {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("{0}")]
    InvalidWindow(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InsightError {
    pub fn data_unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

pub type InsightResult<T> = Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_formatting() {
        let err = InsightError::InsufficientData {
            symbol: "AAPL".to_string(),
            required: 60,
            available: 12,
        };

        let msg = err.to_string();
        assert!(msg.contains("AAPL"));
        assert!(msg.contains("60"));
        assert!(msg.contains("12"));
    }

    #[test]
    fn test_window_error_is_verbatim() {
        let err = InsightError::InvalidWindow("Empty testing dataset produced.".to_string());
        assert_eq!(err.to_string(), "Empty testing dataset produced.");
    }
}
