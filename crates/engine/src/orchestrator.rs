use std::sync::Arc;

use chrono::NaiveTime;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use common::{Error, PriceHistoryProvider, Result};
use paper::{BacktestResult, Backtester};
use screener::{local_time, BucketScreen, CandidateList, PriceBucket, Screener, TradingWindow};
use strategy::build_strategy;

use crate::settings::Settings;

/// One bucket's screen and the backtest of its top candidate.
#[derive(Debug, Clone, Serialize)]
pub struct BucketReport {
    pub bucket: PriceBucket,
    pub candidates: CandidateList,
    /// `None` when the bucket had no candidates.
    pub backtest: Option<BacktestResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub evaluated_at: NaiveTime,
    pub buckets: Vec<BucketReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    OutsideWindow {
        now: NaiveTime,
        window: TradingWindow,
    },
    Completed(CycleReport),
}

/// Runs the gate, the screen and the per-bucket backtests.
///
/// Owns no state between cycles; every call re-fetches from the provider.
pub struct Orchestrator {
    provider: Arc<dyn PriceHistoryProvider>,
    screener: Screener,
    backtester: Backtester,
    settings: Settings,
}

impl Orchestrator {
    /// Fails if the configured strategy cannot be built.
    pub fn new(
        provider: Arc<dyn PriceHistoryProvider>,
        settings: Settings,
        screen_concurrency: usize,
    ) -> Result<Self> {
        let strategy = build_strategy(&settings.strategy)
            .map_err(|e| Error::Config(format!("strategy '{}': {e}", settings.strategy.name)))?;
        let screener = Screener::new(provider.clone(), screen_concurrency)
            .with_lookback_sessions(settings.lookback_sessions);
        let backtester = Backtester::new(Arc::from(strategy), settings.backtest.clone());
        Ok(Self {
            provider,
            screener,
            backtester,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run a cycle at the current local time.
    pub async fn run_now(&self) -> CycleOutcome {
        self.run_cycle(local_time()).await
    }

    /// Run a cycle as if the local time were `now`.
    pub async fn run_cycle(&self, now: NaiveTime) -> CycleOutcome {
        let window = self.settings.trading_window;
        if !window.contains(now) {
            info!(
                now = %now.format("%H:%M:%S"),
                window = %window,
                "Outside trading window, skipping cycle"
            );
            return CycleOutcome::OutsideWindow { now, window };
        }

        info!(
            universe = self.settings.universe.len(),
            buckets = self.settings.buckets.len(),
            "Starting screening cycle"
        );
        let screens = self
            .screener
            .screen_buckets(
                &self.settings.universe,
                &self.settings.thresholds,
                &self.settings.buckets,
            )
            .await;

        let buckets = join_all(screens.into_iter().map(|screen| self.finish_bucket(screen))).await;
        info!(
            backtests = buckets.iter().filter(|b| b.backtest.is_some()).count(),
            "Screening cycle complete"
        );
        CycleOutcome::Completed(CycleReport {
            evaluated_at: now,
            buckets,
        })
    }

    /// Backtest `symbol` over the configured date range.
    pub async fn backtest_symbol(&self, symbol: &str) -> Result<BacktestResult> {
        let window = self.settings.backtest.window();
        let series = self.provider.fetch(symbol, &window).await?;
        Ok(self.backtester.run(&series))
    }

    async fn finish_bucket(&self, screen: BucketScreen) -> BucketReport {
        let BucketScreen { bucket, candidates } = screen;
        let Some(top) = candidates.first() else {
            info!(bucket = %bucket, "No candidates, skipping backtest");
            return BucketReport {
                bucket,
                candidates,
                backtest: None,
            };
        };

        info!(bucket = %bucket, symbol = %top.symbol, "Backtesting top candidate");
        let backtest = match self.backtest_symbol(&top.symbol).await {
            Ok(result) => result,
            Err(e) => {
                warn!(symbol = %top.symbol, error = %e, "Backtest history unavailable");
                BacktestResult::no_data(&top.symbol, e.to_string())
            }
        };
        BucketReport {
            bucket,
            candidates,
            backtest: Some(backtest),
        }
    }
}
