/// How a continuous policy action becomes a simulated trade and a price signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionMapping {
    /// Shares traded for a full-strength (|action| = 1) signal.
    pub hmax: f64,
    pub initial_amount: f64,
    pub buy_cost_pct: f64,
    pub sell_cost_pct: f64,
    /// Fractional price move projected for a full-strength signal.
    pub signal_scale: f64,
    /// Trading days per year used to annualize the Sharpe ratio.
    pub annualization_days: f64,
}

impl Default for ActionMapping {
    fn default() -> Self {
        Self {
            hmax: 100.0,
            initial_amount: 100_000.0,
            buy_cost_pct: 0.001,
            sell_cost_pct: 0.001,
            signal_scale: 0.01,
            annualization_days: 252.0,
        }
    }
}

impl ActionMapping {
    /// Signed share count requested by an action. Positive buys, negative sells.
    pub fn shares_for(&self, action: f32) -> f64 {
        let action = if action.is_finite() {
            f64::from(action.clamp(-1.0, 1.0))
        } else {
            0.0
        };
        (action * self.hmax).trunc()
    }

    /// Bounded price signal in `(-1, 1)` for a requested share count.
    pub fn signal(&self, shares: f64) -> f64 {
        (shares / self.hmax).tanh()
    }

    pub fn project_close(&self, reference_close: f64, signal: f64) -> f64 {
        reference_close * (1.0 + signal * self.signal_scale)
    }
}

/// Cash and holdings of the simulated single-stock account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingAccount {
    pub cash: f64,
    pub shares: f64,
}

impl TradingAccount {
    pub fn new(initial_amount: f64) -> Self {
        Self {
            cash: initial_amount,
            shares: 0.0,
        }
    }

    /// Executes a requested trade at `price`, capped by cash for buys and by
    /// holdings for sells. Returns the signed number of shares actually traded.
    pub fn execute(&mut self, requested: f64, price: f64, mapping: &ActionMapping) -> f64 {
        if price <= 0.0 || requested == 0.0 {
            return 0.0;
        }

        if requested > 0.0 {
            let unit_cost = price * (1.0 + mapping.buy_cost_pct);
            let affordable = (self.cash / unit_cost).floor().max(0.0);
            let quantity = requested.min(affordable);
            self.cash -= quantity * unit_cost;
            self.shares += quantity;
            quantity
        } else {
            let quantity = (-requested).min(self.shares);
            self.cash += quantity * price * (1.0 - mapping.sell_cost_pct);
            self.shares -= quantity;
            -quantity
        }
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.shares * price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shares_for_clips_and_truncates() {
        let mapping = ActionMapping::default();
        assert_eq!(mapping.shares_for(0.456), 45.0);
        assert_eq!(mapping.shares_for(-0.456), -45.0);
        assert_eq!(mapping.shares_for(3.0), 100.0);
        assert_eq!(mapping.shares_for(f32::NAN), 0.0);
    }

    #[test]
    fn test_signal_projection() {
        let mapping = ActionMapping::default();
        assert_eq!(mapping.signal(0.0), 0.0);
        let up = mapping.project_close(100.0, mapping.signal(100.0));
        assert!((up - 100.0 * (1.0 + 1_f64.tanh() * 0.01)).abs() < 1e-12);
    }

    #[test]
    fn test_buy_capped_by_cash() {
        let mapping = ActionMapping::default();
        let mut account = TradingAccount::new(1_000.0);

        let traded = account.execute(100.0, 100.0, &mapping);
        assert_eq!(traded, 9.0);
        assert!((account.cash - (1_000.0 - 9.0 * 100.1)).abs() < 1e-9);
        assert_eq!(account.shares, 9.0);
    }

    #[test]
    fn test_sell_capped_by_holdings() {
        let mapping = ActionMapping::default();
        let mut account = TradingAccount {
            cash: 0.0,
            shares: 5.0,
        };

        let traded = account.execute(-50.0, 10.0, &mapping);
        assert_eq!(traded, -5.0);
        assert_eq!(account.shares, 0.0);
        assert!((account.cash - 49.95).abs() < 1e-9);

        // Nothing left to sell
        assert_eq!(account.execute(-10.0, 10.0, &mapping), 0.0);
    }
}
