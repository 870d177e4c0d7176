use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use common::{Bar, Error, HistoryWindow, PriceHistoryProvider, PriceSeries, Result};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; macd-screener/0.1)";
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Yahoo Finance chart API client.
///
/// Transport failures, 429 and 5xx responses are retried with exponential
/// backoff. A well-formed response without data is returned as-is.
pub struct YahooClient {
    http: Client,
    base_url: String,
    max_retries: u32,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    async fn fetch_once(&self, symbol: &str, window: &HistoryWindow) -> Result<PriceSeries> {
        let url = format!("{}/v8/finance/chart/{symbol}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&query_params(window))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Error::Http(format!("HTTP {status} for {symbol}")));
        }
        // Yahoo reports unknown symbols as 404 with a chart error object.
        let series = parse_chart(symbol, &body);
        if !status.is_success() {
            if let Err(e @ Error::Provider(_)) = series {
                return Err(e);
            }
            return Err(Error::Provider(format!("HTTP {status} for {symbol}")));
        }

        let series = series?;
        Ok(match window {
            HistoryWindow::Trailing { sessions, .. } => keep_last(series, *sessions as usize),
            HistoryWindow::Range { .. } => series,
        })
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooClient {
    async fn fetch(&self, symbol: &str, window: &HistoryWindow) -> Result<PriceSeries> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;
        loop {
            match self.fetch_once(symbol, window).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        symbol = %symbol,
                        error = %e,
                        attempt,
                        backoff = ?backoff,
                        "Chart request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                outcome => {
                    if let Ok(series) = &outcome {
                        debug!(
                            symbol = %symbol,
                            bars = series.len(),
                            window = %window,
                            "Chart fetched"
                        );
                    }
                    return outcome;
                }
            }
        }
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

/// Query string for a chart request. Trailing windows ask for the smallest
/// named range that covers the requested sessions.
fn query_params(window: &HistoryWindow) -> Vec<(&'static str, String)> {
    let interval = window.interval().to_string();
    match window {
        HistoryWindow::Trailing { sessions, .. } => vec![
            ("range", range_for_sessions(*sessions).to_string()),
            ("interval", interval),
        ],
        HistoryWindow::Range { start, end, .. } => vec![
            ("period1", day_start(*start).to_string()),
            // period2 is exclusive; include the whole end day.
            ("period2", day_start(end.succ_opt().unwrap_or(*end)).to_string()),
            ("interval", interval),
        ],
    }
}

fn range_for_sessions(sessions: u32) -> &'static str {
    match sessions {
        0..=1 => "1d",
        2..=5 => "5d",
        6..=21 => "1mo",
        22..=63 => "3mo",
        64..=126 => "6mo",
        127..=252 => "1y",
        253..=504 => "2y",
        505..=1260 => "5y",
        1261..=2520 => "10y",
        _ => "max",
    }
}

fn day_start(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

fn keep_last(mut series: PriceSeries, n: usize) -> PriceSeries {
    let excess = series.bars.len().saturating_sub(n);
    series.bars.drain(..excess);
    series
}

/// Decode a chart response body into a series.
///
/// JSON nulls become missing fields. A result without a timestamp array is an
/// empty series. An error object is a provider error.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;
    if let Some(err) = envelope.chart.error {
        return Err(Error::Provider(format!(
            "{symbol}: {} ({})",
            err.description, err.code
        )));
    }
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::new(symbol, Vec::new()));
    };
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let bars = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let timestamp = Utc.timestamp_opt(*ts, 0).single()?;
            Some(Bar {
                timestamp,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                volume: at(&quote.volume, i),
            })
        })
        .collect();
    Ok(PriceSeries::new(symbol, bars))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Deserialize, Default)]
struct Quote {
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
