use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use common::{Error, Result};
use paper::BacktestConfig;
use screener::{PriceBucket, Screener, Thresholds, TradingWindow};
use strategy::StrategyConfig;

const DEFAULT_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "F", "GE", "SIRI", "NOK", "AMD", "INTC", "X", "T",
    "PFE", "BAC", "NIO", "PLTR", "FCEL", "UAL", "AAL", "SOFI", "C", "KO", "WMT", "NVDA", "PYPL",
    "CSCO", "CRM", "ABNB", "SNAP",
];

/// Contents of the TOML settings file. Every field has a default.
///
/// ```toml
/// universe = ["AAPL", "F", "SIRI"]
///
/// [thresholds]
/// min_volatility = 0.005
/// min_avg_volume = 500000
///
/// [trading_window]
/// start = "09:30:00"
/// end = "11:00:00"
///
/// [[buckets]]
/// min = 0.0
/// max = 5.0
///
/// [backtest]
/// start = "2023-01-01"
/// end = "2023-12-31"
/// starting_cash = 10000.0
///
/// [ledgers]
/// ea1 = "data/statement1.csv"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub universe: Vec<String>,
    pub buckets: Vec<PriceBucket>,
    pub thresholds: Thresholds,
    pub trading_window: TradingWindow,
    /// Trailing sessions fetched per symbol when screening.
    pub lookback_sessions: u32,
    pub backtest: BacktestConfig,
    pub strategy: StrategyConfig,
    /// Statement files by name, served by the ledger endpoints.
    pub ledgers: BTreeMap<String, PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            universe: DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect(),
            buckets: PriceBucket::defaults(),
            thresholds: Thresholds::default(),
            trading_window: TradingWindow::default(),
            lookback_sessions: Screener::DEFAULT_LOOKBACK_SESSIONS,
            backtest: BacktestConfig::default(),
            strategy: StrategyConfig::default(),
            ledgers: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load and validate the settings file. Panics with a clear message if the
    /// file cannot be read, parsed or validated.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read settings at '{path}': {e}"));
        Self::parse(&content).unwrap_or_else(|e| panic!("Invalid settings at '{path}': {e}"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.universe.is_empty() {
            return Err(Error::Config("universe is empty".into()));
        }
        if self.lookback_sessions < 2 {
            return Err(Error::Config(
                "lookback_sessions must be at least 2 to measure volatility".into(),
            ));
        }
        for bucket in &self.buckets {
            if !(bucket.min < bucket.max) {
                return Err(Error::Config(format!("bucket {bucket} is empty")));
            }
        }
        if self.trading_window.start > self.trading_window.end {
            return Err(Error::Config(format!(
                "trading window {} ends before it starts",
                self.trading_window
            )));
        }
        let bt = &self.backtest;
        if bt.start > bt.end {
            return Err(Error::Config(format!(
                "backtest range {}..{} is reversed",
                bt.start, bt.end
            )));
        }
        if !bt.starting_cash.is_finite() || bt.starting_cash < 0.0 {
            return Err(Error::Config("starting_cash must be a non-negative number".into()));
        }
        if !bt.slippage_bps.is_finite() || bt.slippage_bps < 0.0 {
            return Err(Error::Config("slippage_bps must be a non-negative number".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use paper::SizingPolicy;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings.universe.len(), 30);
        assert_eq!(settings.buckets, PriceBucket::defaults());
        assert_eq!(settings.trading_window, TradingWindow::default());
        assert_eq!(settings.backtest.starting_cash, 10_000.0);
        assert_eq!(settings.backtest.sizing, SizingPolicy::AllCash);
        assert_eq!(settings.strategy.strategy_type, "macd");
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::parse(
            r#"
            universe = ["F", "SIRI"]
            lookback_sessions = 10

            [thresholds]
            min_volatility = 0.01

            [trading_window]
            start = "14:00:00"
            end = "15:00:00"

            [[buckets]]
            min = 1.0
            max = 3.0

            [backtest]
            start = "2022-06-01"
            sizing = { fixed = 5 }
            slippage_bps = 2.5

            [strategy.params]
            fast = 8

            [ledgers]
            ea1 = "data/ea1.csv"
            "#,
        )
        .unwrap();

        assert_eq!(settings.universe, vec!["F", "SIRI"]);
        assert_eq!(settings.lookback_sessions, 10);
        assert_eq!(settings.thresholds.min_volatility, 0.01);
        assert_eq!(settings.thresholds.min_avg_volume, 500_000.0);
        assert_eq!(
            settings.trading_window.start,
            NaiveTime::from_hms_opt(14, 0, 0).unwrap()
        );
        assert_eq!(
            settings.trading_window.end,
            NaiveTime::from_hms_opt(15, 0, 0).unwrap()
        );
        assert_eq!(settings.buckets, vec![PriceBucket::new(1.0, 3.0)]);
        assert_eq!(
            settings.backtest.start,
            NaiveDate::from_ymd_opt(2022, 6, 1).unwrap()
        );
        assert_eq!(settings.backtest.sizing, SizingPolicy::Fixed(5));
        assert_eq!(settings.backtest.slippage_bps, 2.5);
        assert_eq!(settings.ledgers["ea1"], PathBuf::from("data/ea1.csv"));
        assert!(strategy::build_strategy(&settings.strategy).is_ok());
    }

    #[test]
    fn rejects_invalid_values() {
        for bad in [
            "universe = []",
            "[[buckets]]\nmin = 5.0\nmax = 5.0",
            "[backtest]\nstart = \"2024-01-01\"\nend = \"2023-01-01\"",
            "[backtest]\nstarting_cash = -1.0",
            "lookback_sessions = 1",
            "[trading_window]\nstart = \"14:00:00\"",
            "[trading_window]\nstart = \"11:00:00\"\nend = \"09:30:00\"",
            "universe = 3",
        ] {
            let err = Settings::parse(bad).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{bad}: {err}");
        }
    }
}
