use crate::domain::market::PriceBar;
use chrono::{DateTime, Utc};
use serde::Deserialize;

// ===== Chart API wire types =====

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Option<Vec<i64>>,
    #[serde(default)]
    pub indicators: Option<ChartIndicators>,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

/// Column-oriented OHLCV. Any column may be missing or shorter than the
/// timestamp list, and any cell may be null.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub open: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub high: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub low: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub close: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub volume: Option<Vec<Option<f64>>>,
}

impl ChartResult {
    /// Zips the columns into bars. Rows with a missing price are dropped, a
    /// missing volume counts as zero. Bar dates are truncated to midnight UTC.
    pub fn into_bars(self) -> Vec<PriceBar> {
        let timestamps = self.timestamp.unwrap_or_default();
        let quote = self
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .unwrap_or_default();

        let cell = |column: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
            column.as_ref().and_then(|c| c.get(i).copied().flatten())
        };

        timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let date = trading_day(ts)?;
                Some(PriceBar {
                    date,
                    open: cell(&quote.open, i)?,
                    high: cell(&quote.high, i)?,
                    low: cell(&quote.low, i)?,
                    close: cell(&quote.close, i)?,
                    volume: cell(&quote.volume, i).unwrap_or(0.0),
                })
            })
            .collect()
    }
}

fn trading_day(unix_seconds: i64) -> Option<DateTime<Utc>> {
    let at = DateTime::from_timestamp(unix_seconds, 0)?;
    Some(at.date_naive().and_hms_opt(0, 0, 0)?.and_utc())
}
