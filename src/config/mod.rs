//! Configuration module for finrl-insight.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: Server, Pipeline (windows and cache) and Model.

mod model_config;
mod pipeline_config;
mod server_config;

pub use model_config::ModelEnvConfig;
pub use pipeline_config::{MarketDataSource, PipelineEnvConfig};
pub use server_config::{CorsOrigins, ServerEnvConfig};

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerEnvConfig,
    pub pipeline: PipelineEnvConfig,
    pub model: ModelEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerEnvConfig::from_env().context("Failed to load server config")?,
            pipeline: PipelineEnvConfig::from_env().context("Failed to load pipeline config")?,
            model: ModelEnvConfig::from_env().context("Failed to load model config")?,
        })
    }
}

pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + ToString,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .context(format!("Failed to parse {}", key))
}

pub(crate) fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<bool>()
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_defaults() {
        let config = Config::from_env().expect("Should parse with defaults");
        assert_eq!(config.model.hmax, 100.0);
        assert_eq!(config.pipeline.cache_ttl_minutes, 60);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u32 = parse_env("FINRL_TEST_UNSET_KEY_FOR_PARSING", 42).unwrap();
        assert_eq!(value, 42);
        assert!(parse_bool("FINRL_TEST_UNSET_BOOL_KEY", true));
    }
}
