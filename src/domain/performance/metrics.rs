use super::stats::{Stats, round_to};
use crate::domain::results::BacktestMetrics;

impl BacktestMetrics {
    /// Summarizes an equity curve into the reported risk metrics.
    ///
    /// Equity, return and drawdown are rounded to 2 decimals, Sharpe to 3.
    pub fn from_equity_curve(equity: &[f64], annualization_days: f64) -> Self {
        let (Some(&initial), Some(&final_equity)) = (equity.first(), equity.last()) else {
            return Self::default();
        };

        let returns = Stats::calculate_returns(equity);

        Self {
            final_equity: round_to(final_equity, 2),
            total_return_pct: round_to(Stats::total_return_pct(initial, final_equity), 2),
            sharpe_ratio: round_to(Stats::sharpe_ratio(&returns, annualization_days), 3),
            max_drawdown_pct: round_to(Stats::max_drawdown_pct(equity), 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_for_reference_curve() {
        let metrics = BacktestMetrics::from_equity_curve(&[100.0, 110.0, 90.0, 120.0], 252.0);

        assert_eq!(metrics.final_equity, 120.0);
        assert_eq!(metrics.total_return_pct, 20.0);
        assert_eq!(metrics.max_drawdown_pct, -18.18);
        assert!(metrics.sharpe_ratio > 0.0);
    }

    #[test]
    fn test_metrics_flat_curve() {
        let metrics = BacktestMetrics::from_equity_curve(&[100_000.0; 5], 252.0);

        assert_eq!(metrics.total_return_pct, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown_pct, 0.0);
    }

    #[test]
    fn test_metrics_empty_curve() {
        assert_eq!(
            BacktestMetrics::from_equity_curve(&[], 252.0),
            BacktestMetrics::default()
        );
    }
}
