use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV sample as returned by a price history provider.
///
/// Providers frequently return gaps (halted sessions, partial days), so every
/// numeric field is optional here. Consumers decide how strict to be: the
/// screener rejects a series with any missing close, the backtester skips
/// unusable bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    /// Close price when it is present and finite.
    pub fn usable_close(&self) -> Option<f64> {
        self.close.filter(|c| c.is_finite())
    }
}

/// A symbol together with its bars, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        // Stable sort keeps duplicate timestamps in provider order.
        bars.sort_by_key(|b| b.timestamp);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// All closes in order, or `None` if any bar is missing its close.
    pub fn closes(&self) -> Option<Vec<f64>> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Bars that carry a usable close, in order.
    pub fn usable_bars(&self) -> Vec<&Bar> {
        self.bars
            .iter()
            .filter(|b| b.usable_close().is_some())
            .collect()
    }
}

/// Sampling interval requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Interval {
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1h")]
    OneHour,
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::OneDay => write!(f, "1d"),
            Interval::OneHour => write!(f, "1h"),
        }
    }
}

/// The slice of history to request for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HistoryWindow {
    /// The most recent `sessions` trading sessions.
    Trailing { sessions: u32, interval: Interval },
    /// Inclusive calendar date range.
    Range {
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    },
}

impl HistoryWindow {
    pub fn trailing_days(sessions: u32) -> Self {
        HistoryWindow::Trailing {
            sessions,
            interval: Interval::OneDay,
        }
    }

    pub fn daily_range(start: NaiveDate, end: NaiveDate) -> Self {
        HistoryWindow::Range {
            start,
            end,
            interval: Interval::OneDay,
        }
    }

    pub fn interval(&self) -> Interval {
        match self {
            HistoryWindow::Trailing { interval, .. } | HistoryWindow::Range { interval, .. } => {
                *interval
            }
        }
    }
}

impl std::fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryWindow::Trailing { sessions, interval } => {
                write!(f, "last {sessions} sessions @ {interval}")
            }
            HistoryWindow::Range {
                start,
                end,
                interval,
            } => write!(f, "{start}..={end} @ {interval}"),
        }
    }
}

/// Per-bar crossover of the MACD line against its signal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CrossoverState {
    #[default]
    None,
    /// MACD crossed above the signal line on this bar.
    BullCross,
    /// MACD crossed below the signal line on this bar.
    BearCross,
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Long-only holding in whole units. `quantity == 0` means flat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: u64,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }
}

/// An executed simulated order. Entries are appended and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: u64,
    /// Cash balance immediately after the fill.
    pub resulting_cash: f64,
}

impl Trade {
    /// Cash moved by this trade: negative for buys, positive for sells.
    pub fn cash_delta(&self) -> f64 {
        let notional = self.price * self.quantity as f64;
        match self.side {
            OrderSide::Buy => -notional,
            OrderSide::Sell => notional,
        }
    }
}
