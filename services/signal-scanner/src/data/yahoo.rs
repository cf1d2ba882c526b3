//! Yahoo Finance chart API adapter.
//!
//! # Endpoint
//! `GET {base}/v8/finance/chart/{symbol}?period1=..&period2=..&interval=1d`
//!
//! The endpoint takes a calendar-time span, not a bar count, so requests are
//! widened to cover weekends and holidays and then trimmed to the requested
//! number of bars.

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

use super::provider::{HistoryProvider, ProviderError};
use super::Bar;

// ============================================================================
// Constants
// ============================================================================

/// Yahoo Finance API base URL
const YAHOO_API_BASE: &str = "https://query1.finance.yahoo.com";

/// Chart endpoint path segments
const CHART_PATH: [&str; 3] = ["v8", "finance", "chart"];

/// The chart API rejects requests without a browser-like agent
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0 Safari/537.36"
);

/// Calendar days needed to cover `trading_days` bars.
fn calendar_span(trading_days: usize) -> i64 {
    (trading_days as i64) * 7 / 5 + 7
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Daily history from the Yahoo Finance chart API.
pub struct YahooFinanceAdapter {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooFinanceAdapter {
    /// Create an adapter with the given request timeout.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(YAHOO_API_BASE, timeout)
    }

    /// Create an adapter against a different host (proxies, test servers).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Yahoo base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Yahoo base URL cannot hold a path: {}", base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Chart URL for `symbol`; the symbol is percent-encoded as one path segment.
    fn chart_url(
        &self,
        symbol: &str,
        days: usize,
        now: DateTime<Utc>,
    ) -> Result<Url, ProviderError> {
        let period2 = now.timestamp();
        let period1 = (now - ChronoDuration::days(calendar_span(days))).timestamp();

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ProviderError::InvalidRequest(format!("bad base URL {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(CHART_PATH)
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");
        Ok(url)
    }
}

#[async_trait]
impl HistoryProvider for YahooFinanceAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn daily_bars(&self, symbol: &str, days: usize) -> Result<Vec<Bar>, ProviderError> {
        if days == 0 {
            return Err(ProviderError::InvalidRequest("days must be positive".into()));
        }
        if symbol.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("empty symbol".into()));
        }

        let url = self.chart_url(symbol, days, Utc::now())?;
        debug!(url = %url, symbol = symbol, "Fetching daily history from Yahoo");

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let chart: ChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let mut bars = parse_chart(symbol, chart)?;
        if bars.len() > days {
            bars.drain(..bars.len() - days);
        }
        Ok(bars)
    }
}

/// Convert a chart payload into bars, oldest first.
///
/// Rows with any missing OHLCV value (halts, partial rows) are skipped.
fn parse_chart(symbol: &str, chart: ChartResponse) -> Result<Vec<Bar>, ProviderError> {
    if let Some(err) = chart.chart.error {
        return Err(ProviderError::Provider(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let result = chart
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| ProviderError::EmptyResponse(symbol.to_string()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::EmptyResponse(symbol.to_string()))?;
    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let values = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
            at(&quote.volume, i),
        );
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = values else {
            continue;
        };

        let date = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| ProviderError::Parse(format!("Invalid timestamp: {}", ts)))?
            .date_naive();

        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if bars.is_empty() {
        return Err(ProviderError::EmptyResponse(symbol.to_string()));
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ============================================================================
// Tests
// ============================================================================
