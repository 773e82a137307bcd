//! Policy artifact and action-mapping configuration parsing from environment variables.

use super::{parse_bool, parse_env};
use crate::application::simulation::ActionMapping;
use anyhow::{Result, ensure};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub model_path: PathBuf,
    /// Load the policy at startup (fatal on failure) instead of on first request.
    pub eager_load: bool,
    pub hmax: f64,
    pub initial_amount: f64,
    pub buy_cost_pct: f64,
    pub sell_cost_pct: f64,
    pub signal_scale: f64,
    pub annualization_days: f64,
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = ActionMapping::default();
        let config = Self {
            model_path: env::var("FINRL_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("ppo_model.onnx")),
            eager_load: parse_bool("FINRL_MODEL_EAGER_LOAD", true),
            hmax: parse_env("FINRL_HMAX", defaults.hmax)?,
            initial_amount: parse_env("FINRL_INITIAL_AMOUNT", defaults.initial_amount)?,
            buy_cost_pct: parse_env("FINRL_BUY_COST_PCT", defaults.buy_cost_pct)?,
            sell_cost_pct: parse_env("FINRL_SELL_COST_PCT", defaults.sell_cost_pct)?,
            signal_scale: parse_env("FINRL_SIGNAL_SCALE", defaults.signal_scale)?,
            annualization_days: parse_env(
                "FINRL_ANNUALIZATION_DAYS",
                defaults.annualization_days,
            )?,
        };

        ensure!(config.hmax > 0.0, "FINRL_HMAX must be > 0");
        ensure!(config.initial_amount > 0.0, "FINRL_INITIAL_AMOUNT must be > 0");
        ensure!(
            (0.0..1.0).contains(&config.buy_cost_pct) && (0.0..1.0).contains(&config.sell_cost_pct),
            "transaction cost fractions must be in [0, 1)"
        );
        ensure!(config.annualization_days >= 0.0, "FINRL_ANNUALIZATION_DAYS must be >= 0");
        Ok(config)
    }

    pub fn action_mapping(&self) -> ActionMapping {
        ActionMapping {
            hmax: self.hmax,
            initial_amount: self.initial_amount,
            buy_cost_pct: self.buy_cost_pct,
            sell_cost_pct: self.sell_cost_pct,
            signal_scale: self.signal_scale,
            annualization_days: self.annualization_days,
        }
    }
}
