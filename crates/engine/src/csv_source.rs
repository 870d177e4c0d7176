use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use common::{Bar, Error, HistoryWindow, PriceHistoryProvider, PriceSeries, Result};

/// Reads `{dir}/{SYMBOL}.csv` files in the layout yfinance exports.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

#[async_trait]
impl PriceHistoryProvider for CsvProvider {
    async fn fetch(&self, symbol: &str, window: &HistoryWindow) -> Result<PriceSeries> {
        let path = self.path_for(symbol);
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::Provider(format!("{}: {e}", path.display())))?;
        let series = parse_history(symbol, &content, &path)?;
        let series = apply_window(series, window);
        debug!(symbol = %symbol, bars = series.len(), window = %window, "CSV history loaded");
        Ok(series)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Parse a history file. Header names are matched case-insensitively and only
/// `Close` is required. Rows with an unreadable date are dropped and
/// non-numeric cells become missing values.
fn parse_history(symbol: &str, content: &[u8], path: &Path) -> Result<PriceSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);
    let headers = rdr
        .headers()
        .map_err(|e| Error::Csv(e.to_string()))?
        .clone();
    let col = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };

    let date = col(&["date", "datetime"]).ok_or_else(|| {
        Error::Provider(format!("{} has no Date column", path.display()))
    })?;
    let close = col(&["close"]).ok_or_else(|| {
        Error::Provider(format!("{} has no Close column", path.display()))
    })?;
    let (open, high, low, volume) = (
        col(&["open"]),
        col(&["high"]),
        col(&["low"]),
        col(&["volume"]),
    );

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| Error::Csv(e.to_string()))?;
        let Some(timestamp) = record.get(date).and_then(parse_timestamp) else {
            continue;
        };
        let number = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .and_then(|raw| raw.parse::<f64>().ok())
        };
        bars.push(Bar {
            timestamp,
            open: number(open),
            high: number(high),
            low: number(low),
            close: number(Some(close)),
            volume: number(volume),
        });
    }
    Ok(PriceSeries::new(symbol, bars))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn apply_window(mut series: PriceSeries, window: &HistoryWindow) -> PriceSeries {
    match window {
        HistoryWindow::Trailing { sessions, .. } => {
            let excess = series.bars.len().saturating_sub(*sessions as usize);
            series.bars.drain(..excess);
        }
        HistoryWindow::Range { start, end, .. } => {
            series.bars.retain(|b| {
                let day = b.timestamp.date_naive();
                *start <= day && day <= *end
            });
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2023-01-03 00:00:00-05:00,12.1,12.4,12.0,12.2,11.9,41000000
2023-01-04 00:00:00-05:00,12.3,12.6,12.2,,12.0,38000000
2023-01-05 00:00:00-05:00,12.5,12.9,12.4,12.8,12.5,45000000
garbage,1,1,1,1,1,1
2023-01-06 00:00:00-05:00,12.8,13.0,12.6,12.9,12.6,39000000
";

    fn provider_with(files: &[(&str, &str)]) -> (tempfile::TempDir, CsvProvider) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let provider = CsvProvider::new(dir.path());
        (dir, provider)
    }

    #[tokio::test]
    async fn reads_yfinance_export() {
        let (_dir, provider) = provider_with(&[("F.csv", HISTORY)]);
        let series = provider
            .fetch("F", &HistoryWindow::trailing_days(30))
            .await
            .unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.bars[0].close, Some(12.2));
        assert_eq!(series.bars[1].close, None);
        assert_eq!(series.bars[3].volume, Some(39_000_000.0));
        assert_eq!(series.bars[0].timestamp.to_rfc3339(), "2023-01-03T05:00:00+00:00");
    }

    #[tokio::test]
    async fn trailing_window_keeps_most_recent_rows() {
        let (_dir, provider) = provider_with(&[("F.csv", HISTORY)]);
        let series = provider
            .fetch("F", &HistoryWindow::trailing_days(2))
            .await
            .unwrap();
        let closes: Vec<_> = series.bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![Some(12.8), Some(12.9)]);
    }

    #[tokio::test]
    async fn range_window_is_inclusive() {
        let (_dir, provider) = provider_with(&[("F.csv", HISTORY)]);
        let start = NaiveDate::from_ymd_opt(2023, 1, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap();
        let series = provider
            .fetch("F", &HistoryWindow::daily_range(start, end))
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn lowercase_headers_and_plain_dates() {
        let (_dir, provider) = provider_with(&[(
            "KO.csv",
            "date,close,volume\n2024-02-01,60.5,1000\n2024-02-02,61.0,abc\n",
        )]);
        let series = provider
            .fetch("KO", &HistoryWindow::trailing_days(5))
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars[1].volume, None);
        assert_eq!(series.bars[0].open, None);
    }

    #[tokio::test]
    async fn missing_close_column_is_a_provider_error() {
        let (_dir, provider) = provider_with(&[("X.csv", "Date,Open\n2024-01-02,1.0\n")]);
        let err = provider
            .fetch("X", &HistoryWindow::trailing_days(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ref m) if m.contains("Close")));
    }

    #[tokio::test]
    async fn missing_file_is_a_provider_error() {
        let (_dir, provider) = provider_with(&[]);
        let err = provider
            .fetch("NOPE", &HistoryWindow::trailing_days(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
