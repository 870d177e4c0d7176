use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use common::{Bar, CrossoverState, HistoryWindow, Position, PriceSeries, Trade};
use strategy::{MacdCrossStrategy, Strategy};

use crate::broker::PaperBroker;

/// How many units to buy on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizingPolicy {
    /// As many whole units as the available cash allows.
    #[default]
    AllCash,
    /// A fixed number of units; the entry is skipped if unaffordable.
    Fixed(u64),
}

/// The `[backtest]` table of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub starting_cash: f64,
    pub slippage_bps: f64,
    pub sizing: SizingPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date"),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).expect("valid date"),
            starting_cash: 10_000.0,
            slippage_bps: 0.0,
            sizing: SizingPolicy::AllCash,
        }
    }
}

impl BacktestConfig {
    pub fn window(&self) -> HistoryWindow {
        HistoryWindow::daily_range(self.start, self.end)
    }
}

/// Simulator state. Long-only, at most one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SimState {
    Flat,
    Long { quantity: u64 },
}

/// What the simulator should do on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Hold,
    EnterLong,
    ExitLong,
}

/// Transition table: enter on a bullish cross while flat, exit on a
/// bearish cross while long, otherwise hold.
pub fn transition(state: SimState, crossover: CrossoverState) -> Action {
    match (state, crossover) {
        (SimState::Flat, CrossoverState::BullCross) => Action::EnterLong,
        (SimState::Long { .. }, CrossoverState::BearCross) => Action::ExitLong,
        _ => Action::Hold,
    }
}

/// Outcome of a completed simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub strategy: String,
    pub bars: usize,
    pub first_bar: DateTime<Utc>,
    pub last_bar: DateTime<Utc>,
    pub starting_cash: f64,
    pub final_cash: f64,
    pub final_position: Position,
    pub final_state: SimState,
    pub last_close: f64,
    /// Open position marked to market at `last_close`; never liquidated.
    pub position_value: f64,
    pub total_value: f64,
    pub return_pct: f64,
    pub trades: Vec<Trade>,
}

/// Either a report or an explanation of why nothing could be simulated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BacktestResult {
    Completed(BacktestReport),
    NoData { symbol: String, reason: String },
}

impl BacktestResult {
    pub fn no_data(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        BacktestResult::NoData {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn report(&self) -> Option<&BacktestReport> {
        match self {
            BacktestResult::Completed(report) => Some(report),
            BacktestResult::NoData { .. } => None,
        }
    }
}

/// Runs a strategy's crossover states through a [`PaperBroker`].
pub struct Backtester {
    strategy: Arc<dyn Strategy>,
    config: BacktestConfig,
}

impl Backtester {
    pub fn new(strategy: Arc<dyn Strategy>, config: BacktestConfig) -> Self {
        Self { strategy, config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Simulate over `series` with the configured starting cash.
    pub fn run(&self, series: &PriceSeries) -> BacktestResult {
        self.run_with_cash(series, self.config.starting_cash)
    }

    pub fn run_with_cash(&self, series: &PriceSeries, starting_cash: f64) -> BacktestResult {
        let bars = series.usable_bars();
        if bars.is_empty() {
            warn!(symbol = %series.symbol, "No usable closes for backtest");
            return BacktestResult::no_data(&series.symbol, "series has no usable closes");
        }
        let closes: Vec<f64> = bars.iter().filter_map(|b| b.usable_close()).collect();
        let crossovers = self.strategy.crossovers(&closes);
        simulate(
            &series.symbol,
            self.strategy.name(),
            &bars,
            &crossovers,
            starting_cash,
            &self.config,
        )
    }

    /// Drive the simulator from externally supplied crossover states, one per
    /// usable bar of `series`.
    pub fn run_with_crossovers(
        &self,
        series: &PriceSeries,
        crossovers: &[CrossoverState],
        starting_cash: f64,
    ) -> BacktestResult {
        let bars = series.usable_bars();
        if bars.is_empty() {
            return BacktestResult::no_data(&series.symbol, "series has no usable closes");
        }
        if bars.len() != crossovers.len() {
            return BacktestResult::no_data(
                &series.symbol,
                format!(
                    "{} crossover states for {} usable bars",
                    crossovers.len(),
                    bars.len()
                ),
            );
        }
        simulate(
            &series.symbol,
            "external crossovers",
            &bars,
            crossovers,
            starting_cash,
            &self.config,
        )
    }
}

/// Backtest with the standard 12/26/9 MACD, all-cash sizing and no slippage.
pub fn run_backtest(series: &PriceSeries, starting_cash: f64) -> BacktestResult {
    let strategy = MacdCrossStrategy::new("MACD 12/26/9".to_string(), 12, 26, 9);
    Backtester::new(Arc::new(strategy), BacktestConfig::default())
        .run_with_cash(series, starting_cash)
}

fn simulate(
    symbol: &str,
    strategy: &str,
    bars: &[&Bar],
    crossovers: &[CrossoverState],
    starting_cash: f64,
    config: &BacktestConfig,
) -> BacktestResult {
    let mut broker = PaperBroker::new(symbol, starting_cash, config.slippage_bps);
    let mut state = SimState::Flat;
    let mut last_close = f64::NAN;

    for (bar, crossover) in bars.iter().zip(crossovers) {
        let Some(close) = bar.usable_close() else {
            continue;
        };
        last_close = close;

        state = match transition(state, *crossover) {
            Action::Hold => state,
            Action::EnterLong => {
                let quantity = match config.sizing {
                    SizingPolicy::AllCash => broker.affordable_quantity(close),
                    SizingPolicy::Fixed(units) => units,
                };
                match broker.buy(bar.timestamp, close, quantity) {
                    Ok(trade) => SimState::Long {
                        quantity: trade.quantity,
                    },
                    Err(e) => {
                        debug!(symbol = %symbol, at = %bar.timestamp, error = %e, "Entry skipped");
                        state
                    }
                }
            }
            Action::ExitLong => match broker.sell_all(bar.timestamp, close) {
                Ok(_) => SimState::Flat,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Exit failed");
                    state
                }
            },
        };
    }

    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return BacktestResult::no_data(symbol, "series has no usable closes");
    };

    let position_value = broker.position_value(last_close);
    let broker_state = broker.into_state();
    let total_value = broker_state.cash + position_value;
    let report = BacktestReport {
        symbol: symbol.to_string(),
        strategy: strategy.to_string(),
        bars: bars.len(),
        first_bar: first.timestamp,
        last_bar: last.timestamp,
        starting_cash,
        final_cash: broker_state.cash,
        final_position: broker_state.position,
        final_state: state,
        last_close,
        position_value,
        total_value,
        return_pct: if starting_cash > 0.0 {
            (total_value / starting_cash - 1.0) * 100.0
        } else {
            0.0
        },
        trades: broker_state.trades,
    };

    info!(
        symbol = %report.symbol,
        trades = report.trades.len(),
        final_cash = report.final_cash,
        total_value = report.total_value,
        "Backtest complete"
    );
    BacktestResult::Completed(report)
}
