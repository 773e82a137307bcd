//! Data-window and cache configuration parsing from environment variables.

use super::{parse_bool, parse_env};
use anyhow::{Result, bail, ensure};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Where daily bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketDataSource {
    Yahoo,
    /// Deterministic synthetic bars, for offline runs.
    Mock,
}

impl FromStr for MarketDataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(MarketDataSource::Yahoo),
            "mock" => Ok(MarketDataSource::Mock),
            other => bail!("unknown market data source '{}' (expected yahoo or mock)", other),
        }
    }
}

/// Environment configuration for market-data windows and result caching
#[derive(Debug, Clone)]
pub struct PipelineEnvConfig {
    pub lookback_years: u32,
    pub test_window_days: u32,
    /// Timesteps the deployed policy was trained for. Reported, never used to train.
    pub training_timesteps: u64,
    pub history_points: usize,
    pub cache_ttl_minutes: u64,
    pub cache_sweep_enabled: bool,
    pub yahoo_chart_url: String,
    pub market_data: MarketDataSource,
}

impl Default for PipelineEnvConfig {
    fn default() -> Self {
        Self {
            lookback_years: 2,
            test_window_days: 60,
            training_timesteps: 10_000,
            history_points: 240,
            cache_ttl_minutes: 60,
            cache_sweep_enabled: true,
            yahoo_chart_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            market_data: MarketDataSource::Yahoo,
        }
    }
}

impl PipelineEnvConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            lookback_years: parse_env("FINRL_LOOKBACK_YEARS", defaults.lookback_years)?,
            test_window_days: parse_env("FINRL_TEST_WINDOW_DAYS", defaults.test_window_days)?,
            training_timesteps: parse_env(
                "FINRL_TRAINING_TIMESTEPS",
                defaults.training_timesteps,
            )?,
            history_points: parse_env("FINRL_HISTORY_POINTS", defaults.history_points)?,
            cache_ttl_minutes: parse_env("FINRL_CACHE_TTL_MINUTES", defaults.cache_ttl_minutes)?,
            cache_sweep_enabled: parse_bool("FINRL_CACHE_SWEEP", defaults.cache_sweep_enabled),
            yahoo_chart_url: env::var("YAHOO_CHART_URL").unwrap_or(defaults.yahoo_chart_url),
            market_data: match env::var("FINRL_MARKET_DATA") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.market_data,
            },
        };

        ensure!(config.lookback_years > 0, "FINRL_LOOKBACK_YEARS must be > 0");
        ensure!(config.test_window_days > 0, "FINRL_TEST_WINDOW_DAYS must be > 0");
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(365 * i64::from(self.lookback_years))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineEnvConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.lookback().num_days(), 730);
        assert_eq!(config.test_window_days, 60);
        assert_eq!(config.market_data, MarketDataSource::Yahoo);
    }

    #[test]
    fn test_market_data_source_parsing() {
        assert_eq!(" Mock ".parse::<MarketDataSource>().unwrap(), MarketDataSource::Mock);
        assert!("bloomberg".parse::<MarketDataSource>().is_err());
    }
}
