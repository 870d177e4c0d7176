use std::collections::HashSet;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use common::{HistoryWindow, PriceHistoryProvider};

use crate::criteria::{PriceBucket, ScreeningCriteria, Thresholds};
use crate::rank::{rank, Candidate, CandidateList};
use crate::stats::{derive_stats, SkipReason, SymbolStats};

/// Ranked output for one price bucket.
#[derive(Debug, Clone, Serialize)]
pub struct BucketScreen {
    pub bucket: PriceBucket,
    pub candidates: CandidateList,
}

/// Scans a universe of symbols against the price history provider.
///
/// Every call re-fetches from the provider; nothing is cached between calls.
pub struct Screener {
    provider: Arc<dyn PriceHistoryProvider>,
    concurrency: usize,
    lookback_sessions: u32,
}

impl Screener {
    pub const DEFAULT_LOOKBACK_SESSIONS: u32 = 5;

    pub fn new(provider: Arc<dyn PriceHistoryProvider>, concurrency: usize) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
            lookback_sessions: Self::DEFAULT_LOOKBACK_SESSIONS,
        }
    }

    pub fn with_lookback_sessions(mut self, sessions: u32) -> Self {
        self.lookback_sessions = sessions;
        self
    }

    /// Screen `universe` against a single set of criteria.
    pub async fn screen(&self, universe: &[String], criteria: &ScreeningCriteria) -> CandidateList {
        let stats = self.collect_stats(universe).await;
        select(&stats, criteria)
    }

    /// Screen several buckets, fetching each symbol once.
    pub async fn screen_buckets(
        &self,
        universe: &[String],
        thresholds: &Thresholds,
        buckets: &[PriceBucket],
    ) -> Vec<BucketScreen> {
        let stats = self.collect_stats(universe).await;
        buckets
            .iter()
            .map(|bucket| {
                let candidates = select(&stats, &bucket.criteria(thresholds));
                info!(bucket = %bucket, count = candidates.len(), "Bucket screened");
                BucketScreen {
                    bucket: *bucket,
                    candidates,
                }
            })
            .collect()
    }

    /// Fetch and evaluate every symbol with bounded concurrency.
    /// Failed symbols are logged and dropped.
    async fn collect_stats(&self, universe: &[String]) -> Vec<SymbolStats> {
        let mut seen = HashSet::new();
        let symbols: Vec<String> = universe
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect();
        let window = HistoryWindow::trailing_days(self.lookback_sessions);
        let window = &window;

        let outcomes: Vec<(String, Result<SymbolStats, SkipReason>)> = stream::iter(symbols)
            .map(|symbol| async move {
                let outcome = self.evaluate_symbol(&symbol, window).await;
                (symbol, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let total = outcomes.len();
        let stats: Vec<SymbolStats> = outcomes
            .into_iter()
            .filter_map(|(symbol, outcome)| match outcome {
                Ok(stats) => Some(stats),
                Err(reason) => {
                    warn!(symbol = %symbol, reason = %reason, "Excluding symbol from screen");
                    None
                }
            })
            .collect();

        info!(
            provider = %self.provider.name(),
            scanned = total,
            usable = stats.len(),
            "Universe scanned"
        );
        stats
    }

    async fn evaluate_symbol(
        &self,
        symbol: &str,
        window: &HistoryWindow,
    ) -> Result<SymbolStats, SkipReason> {
        debug!(symbol = %symbol, window = %window, "Fetching screening window");
        let series = self
            .provider
            .fetch(symbol, window)
            .await
            .map_err(|e| SkipReason::Fetch(e.to_string()))?;
        derive_stats(&series)
    }
}

/// Apply `criteria` to already-derived statistics and rank the survivors.
pub fn select(stats: &[SymbolStats], criteria: &ScreeningCriteria) -> CandidateList {
    let admitted = stats
        .iter()
        .filter(|s| criteria.admits(s))
        .map(Candidate::from)
        .collect();
    rank(admitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use common::{Bar, Error, PriceSeries, Result};

    /// In-memory provider keyed by symbol; unknown symbols fail the fetch.
    struct FixtureProvider {
        series: HashMap<String, (Vec<f64>, f64)>,
        fetches: AtomicUsize,
    }

    impl FixtureProvider {
        fn new(entries: &[(&str, &[f64], f64)]) -> Self {
            Self {
                series: entries
                    .iter()
                    .map(|(s, closes, vol)| (s.to_string(), (closes.to_vec(), *vol)))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceHistoryProvider for FixtureProvider {
        async fn fetch(&self, symbol: &str, _window: &HistoryWindow) -> Result<PriceSeries> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let (closes, volume) = self
                .series
                .get(symbol)
                .ok_or_else(|| Error::Provider(format!("unknown symbol {symbol}")))?;
            let bars = closes
                .iter()
                .enumerate()
                .map(|(i, c)| Bar {
                    timestamp: Utc.with_ymd_and_hms(2024, 5, 1 + i as u32, 0, 0, 0).unwrap(),
                    open: Some(*c),
                    high: Some(*c),
                    low: Some(*c),
                    close: Some(*c),
                    volume: Some(*volume),
                })
                .collect();
            Ok(PriceSeries::new(symbol, bars))
        }

        fn name(&self) -> &str {
            "fixture"
        }
    }

    fn universe(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn screen_futures_are_send() {
        let provider = Arc::new(FixtureProvider::new(&[]));
        let screener = Screener::new(provider, 2);
        let universe = universe(&["A"]);
        let thresholds = Thresholds::default();
        let buckets = PriceBucket::defaults();
        let criteria = buckets[0].criteria(&thresholds);

        assert_send(screener.screen_buckets(&universe, &thresholds, &buckets));
        assert_send(screener.screen(&universe, &criteria));
    }

    #[tokio::test]
    async fn flat_symbol_excluded_volatile_symbol_kept() {
        let provider = Arc::new(FixtureProvider::new(&[
            ("A", &[1.0, 1.0], 600_000.0),
            ("B", &[2.0, 2.5], 700_000.0),
        ]));
        let screener = Screener::new(provider, 4);
        let criteria = PriceBucket::new(0.0, 5.0).criteria(&Thresholds::default());

        let list = screener.screen(&universe(&["A", "B"]), &criteria).await;
        let symbols: Vec<&str> = list.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B"]);
        assert_eq!(list[0].direction, crate::Direction::Bullish);
    }

    #[tokio::test]
    async fn failing_symbol_does_not_abort_screen() {
        let provider = Arc::new(FixtureProvider::new(&[("OK", &[3.0, 3.3, 3.1], 900_000.0)]));
        let screener = Screener::new(provider, 2);
        let criteria = PriceBucket::new(0.0, 5.0).criteria(&Thresholds::default());

        let list = screener.screen(&universe(&["MISSING", "OK"]), &criteria).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].symbol, "OK");
    }

    #[tokio::test]
    async fn low_volume_is_excluded() {
        let provider = Arc::new(FixtureProvider::new(&[("THIN", &[3.0, 3.3, 3.1], 100_000.0)]));
        let screener = Screener::new(provider, 2);
        let criteria = PriceBucket::new(0.0, 5.0).criteria(&Thresholds::default());
        assert!(screener.screen(&universe(&["THIN"]), &criteria).await.is_empty());
    }

    #[tokio::test]
    async fn buckets_share_one_fetch_per_symbol() {
        let provider = Arc::new(FixtureProvider::new(&[
            ("PENNY", &[2.0, 2.2, 2.1], 1_000_000.0),
            ("MID", &[10.0, 11.0, 10.5], 2_000_000.0),
            ("LARGE", &[30.0, 31.0, 29.0], 3_000_000.0),
        ]));
        let screener = Screener::new(provider.clone(), 3);

        let screens = screener
            .screen_buckets(
                &universe(&["PENNY", "MID", "LARGE", "MID"]),
                &Thresholds::default(),
                &PriceBucket::defaults(),
            )
            .await;

        assert_eq!(provider.fetches.load(Ordering::SeqCst), 3);
        let tops: Vec<&str> = screens
            .iter()
            .map(|s| s.candidates[0].symbol.as_str())
            .collect();
        assert_eq!(tops, vec!["PENNY", "MID", "LARGE"]);
    }

    #[tokio::test]
    async fn ranking_is_independent_of_universe_order() {
        let entries: Vec<(String, Vec<f64>)> = (0..12)
            .map(|i| (format!("S{i}"), vec![2.0, 2.0 + 0.05 * (i + 1) as f64, 2.1]))
            .collect();
        let fixtures: Vec<(&str, &[f64], f64)> = entries
            .iter()
            .map(|(s, c)| (s.as_str(), c.as_slice(), 750_000.0))
            .collect();
        let provider = Arc::new(FixtureProvider::new(&fixtures));
        let screener = Screener::new(provider, 5);
        let criteria = PriceBucket::new(0.0, 5.0).criteria(&Thresholds::default());

        let forward: Vec<String> = entries.iter().map(|(s, _)| s.clone()).collect();
        let mut backward = forward.clone();
        backward.reverse();

        assert_eq!(
            screener.screen(&forward, &criteria).await,
            screener.screen(&backward, &criteria).await
        );
    }
}
