//! FinRL insight server
//!
//! Serves next-day predictions and holdout backtests from a pretrained
//! PPO policy over HTTP.
//!
//! # Usage
//! ```sh
//! FINRL_MODEL_PATH=ppo_model.onnx cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `HOST` / `PORT` - Bind address (default: 0.0.0.0:8000)
//! - `FINRL_CACHE_TTL_MINUTES` - Result cache lifetime (default: 60)
//! - `FINRL_MODEL_EAGER_LOAD` - Load the model before serving (default: true)
//! - `FINRL_MARKET_DATA` - `yahoo` or `mock` (default: yahoo)

use anyhow::{Context, Result};
use finrl_insight::application::bootstrap::ServicesBootstrap;
use finrl_insight::config::Config;
use finrl_insight::interfaces::http::{AppState, create_app};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("FinRL Insight Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: lookback={}y, test window={}d, cache ttl={}m, market data={:?}",
        config.pipeline.lookback_years,
        config.pipeline.test_window_days,
        config.pipeline.cache_ttl_minutes,
        config.pipeline.market_data
    );
    info!(
        "Policy training budget: {} timesteps (training happens offline)",
        config.pipeline.training_timesteps
    );

    let services = ServicesBootstrap::init(&config)?;
    info!(
        "Policy {} ({} loading)",
        if services.policy.is_loaded() { "ready" } else { "not loaded yet" },
        if config.model.eager_load { "eager" } else { "lazy" }
    );

    if config.pipeline.cache_sweep_enabled {
        let every = services.cache.sweep_interval();
        let _sweeper = services.cache.spawn_sweeper(every);
        info!("Cache sweeper started (interval: {:?})", every);
    }

    let app = create_app(AppState::new(services.service), &config.server.cors_origins);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received. Exiting...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
