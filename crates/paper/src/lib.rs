//! Simulated execution: a single-symbol paper broker and the long-only
//! backtester that drives it from crossover states.

pub mod backtest;
pub mod broker;

pub use backtest::{
    run_backtest, transition, Action, BacktestConfig, BacktestReport, BacktestResult, Backtester,
    SimState, SizingPolicy,
};
pub use broker::{BrokerState, OrderError, PaperBroker};
