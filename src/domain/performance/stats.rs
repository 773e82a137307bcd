/// Shared statistics utilities for equity-curve calculations.
pub struct Stats;

impl Stats {
    /// Simple per-step returns. Steps whose previous value is not positive are skipped.
    pub fn calculate_returns(values: &[f64]) -> Vec<f64> {
        values
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }

    /// Sharpe ratio of per-step returns, annualized by `sqrt(annualization_days)`.
    ///
    /// Uses the sample standard deviation (n-1). Returns 0.0 for fewer than two
    /// returns or a zero deviation.
    pub fn sharpe_ratio(returns: &[f64], annualization_days: f64) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();

        if std_dev > 1e-12 {
            (mean / std_dev) * annualization_days.max(0.0).sqrt()
        } else {
            0.0
        }
    }

    /// Largest peak-to-trough decline as a percentage of the running peak.
    ///
    /// Always <= 0.0; exactly 0.0 for a non-decreasing series.
    pub fn max_drawdown_pct(values: &[f64]) -> f64 {
        let mut peak = f64::MIN;
        let mut worst = 0.0_f64;

        for &value in values {
            peak = peak.max(value);
            if peak > 0.0 {
                worst = worst.min((value - peak) / peak);
            }
        }

        worst * 100.0
    }

    pub fn total_return_pct(initial: f64, final_value: f64) -> f64 {
        if initial > 0.0 {
            (final_value / initial - 1.0) * 100.0
        } else {
            0.0
        }
    }
}

/// Rounds to `decimals` places, the way report values are presented.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
