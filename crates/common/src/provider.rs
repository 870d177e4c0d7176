use async_trait::async_trait;

use crate::{HistoryWindow, PriceSeries, Result};

/// Abstraction over the historical price data source.
///
/// `YahooClient` implements this against the Yahoo Finance chart API and
/// `CsvProvider` against a directory of per-symbol CSV files.
///
/// Implementations may return an empty series, or bars with missing fields.
/// Callers are expected to tolerate both. An `Err` means the fetch itself
/// failed (transport, parse, unknown symbol).
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Fetch bars for `symbol` over `window`, oldest first.
    async fn fetch(&self, symbol: &str, window: &HistoryWindow) -> Result<PriceSeries>;

    /// Short name used in logs and the health endpoint.
    fn name(&self) -> &str;
}
