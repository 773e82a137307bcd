use super::common::ChartResponse;
use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::market::PriceBar;
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::{
    CircuitBreaker, CircuitBreakerError, HttpClientFactory, build_url_with_query, percent_encode,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Why a chart request failed, before it is attributed to a symbol.
#[derive(Debug)]
enum ChartFetchError {
    Unreachable(String),
    RateLimited,
    Status(StatusCode),
    Rejected(String),
}

impl ChartFetchError {
    /// Faults of the endpoint itself, as opposed to a bad symbol.
    fn is_upstream_fault(&self) -> bool {
        match self {
            ChartFetchError::Unreachable(_) | ChartFetchError::RateLimited => true,
            ChartFetchError::Status(status) => status.is_server_error(),
            ChartFetchError::Rejected(_) => false,
        }
    }

    fn into_insight(self, symbol: &str) -> InsightError {
        match self {
            ChartFetchError::RateLimited => InsightError::RateLimited,
            ChartFetchError::Unreachable(reason) => InsightError::data_unavailable(
                symbol,
                format!("Unable to reach Yahoo Finance ({})", reason),
            ),
            ChartFetchError::Status(status) => InsightError::data_unavailable(
                symbol,
                format!("Yahoo Finance returned HTTP {}", status),
            ),
            ChartFetchError::Rejected(description) => {
                InsightError::data_unavailable(symbol, description)
            }
        }
    }
}

/// Daily candles from Yahoo Finance's v8 chart endpoint.
pub struct YahooFinanceClient {
    client: ClientWithMiddleware,
    chart_url: String,
    circuit_breaker: CircuitBreaker,
}

impl YahooFinanceClient {
    pub fn new(chart_url: impl Into<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            chart_url: chart_url.into().trim_end_matches('/').to_string(),
            circuit_breaker: CircuitBreaker::new("YahooChart", 5, 2, Duration::from_secs(30)),
        }
    }

    fn chart_request_url(&self, symbol: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let base = format!("{}/{}", self.chart_url, percent_encode(symbol));
        build_url_with_query(
            &base,
            &[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
                ("includePrePost", "false".to_string()),
                ("events", "div,splits".to_string()),
                ("lang", "en-US".to_string()),
                ("region", "US".to_string()),
            ],
        )
    }

    async fn fetch_chart(&self, url: &str) -> Result<Vec<PriceBar>, ChartFetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ChartFetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("YahooFinanceClient: rate limited");
            return Err(ChartFetchError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChartFetchError::Unreachable(e.to_string()))?;

        // Unknown symbols come back as 404 with a chart.error body.
        let parsed = serde_json::from_str::<ChartResponse>(&body);
        let chart = match parsed {
            Ok(parsed) => parsed.chart,
            Err(_) if !status.is_success() => return Err(ChartFetchError::Status(status)),
            Err(e) => {
                error!("YahooFinanceClient: malformed chart payload: {}", e);
                return Err(ChartFetchError::Unreachable(format!(
                    "malformed response: {}",
                    e
                )));
            }
        };

        if let Some(chart_error) = chart.error {
            let description = chart_error
                .description
                .unwrap_or_else(|| "Unknown Yahoo Finance error.".to_string());
            return Err(ChartFetchError::Rejected(description));
        }
        if !status.is_success() {
            return Err(ChartFetchError::Status(status));
        }

        Ok(chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(|result| result.into_bars())
            .unwrap_or_default())
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> InsightResult<Vec<PriceBar>> {
        if end <= start {
            return Err(InsightError::Internal(
                "history window end must be after its start".to_string(),
            ));
        }

        let url = self.chart_request_url(symbol, start, end);
        debug!("YahooFinanceClient: fetching {}", url);

        let bars = self
            .circuit_breaker
            .call(self.fetch_chart(&url), ChartFetchError::is_upstream_fault)
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Open { retry_in, .. } => InsightError::data_unavailable(
                    symbol,
                    format!(
                        "Yahoo Finance is failing repeatedly, retry in {}s",
                        retry_in.as_secs().max(1)
                    ),
                ),
                CircuitBreakerError::Inner(inner) => inner.into_insight(symbol),
            })?;

        if bars.is_empty() {
            return Err(InsightError::data_unavailable(
                symbol,
                "No price data returned for ticker",
            ));
        }

        debug!("YahooFinanceClient: {} bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    fn name(&self) -> &str {
        "Yahoo Finance"
    }
}
