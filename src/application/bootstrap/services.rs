use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::application::cache::ResultCache;
use crate::application::insight_service::{InsightService, ServiceSettings};
use crate::application::market_data::OBSERVATION_DIM;
use crate::application::ml::{OnnxPolicy, PolicyHandle};
use crate::config::{Config, MarketDataSource};
use crate::domain::ports::{Clock, MarketDataProvider, SystemClock, TradingPolicy};
use crate::infrastructure::mock::MockMarketDataProvider;
use crate::infrastructure::yahoo::YahooFinanceClient;

pub struct ServicesHandle {
    pub service: Arc<InsightService>,
    pub cache: ResultCache,
    pub policy: Arc<PolicyHandle>,
}

pub struct ServicesBootstrap;

impl ServicesBootstrap {
    /// Wires provider, policy, cache and clock from config.
    ///
    /// With eager loading a missing or corrupt model fails here; otherwise
    /// the first request loads it.
    pub fn init(config: &Config) -> Result<ServicesHandle> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let provider: Arc<dyn MarketDataProvider> = match config.pipeline.market_data {
            MarketDataSource::Yahoo => {
                Arc::new(YahooFinanceClient::new(config.pipeline.yahoo_chart_url.clone()))
            }
            MarketDataSource::Mock => Arc::new(MockMarketDataProvider::new()),
        };
        info!("ServicesBootstrap: market data from {}", provider.name());

        let policy = Arc::new(Self::policy_handle(config)?);

        let cache = ResultCache::new(config.pipeline.cache_ttl(), clock.clone());
        let service = Arc::new(InsightService::new(
            provider,
            policy.clone(),
            cache.clone(),
            clock,
            ServiceSettings::from_config(config),
        ));

        Ok(ServicesHandle {
            service,
            cache,
            policy,
        })
    }

    fn policy_handle(config: &Config) -> Result<PolicyHandle> {
        let model_path = config.model.model_path.clone();

        if config.model.eager_load {
            let policy = OnnxPolicy::load(&model_path, OBSERVATION_DIM)
                .with_context(|| format!("Failed to load policy from {:?}", model_path))?;
            return Ok(PolicyHandle::ready(Arc::new(policy)));
        }

        info!(
            "ServicesBootstrap: policy {:?} will load on first request",
            model_path
        );
        Ok(PolicyHandle::lazy(move || {
            let policy = OnnxPolicy::load(&model_path, OBSERVATION_DIM)?;
            Ok(Arc::new(policy) as Arc<dyn TradingPolicy>)
        }))
    }
}
