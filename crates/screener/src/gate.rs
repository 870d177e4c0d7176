use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

/// Time-of-day window during which screening and backtests may run.
/// Both bounds are inclusive and interpreted in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for TradingWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 30, 0).expect("09:30 is a valid time"),
            end: NaiveTime::from_hms_opt(11, 0, 0).expect("11:00 is a valid time"),
        }
    }
}

impl TradingWindow {
    pub fn contains(&self, now: NaiveTime) -> bool {
        self.start <= now && now <= self.end
    }
}

impl std::fmt::Display for TradingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Whether `now` falls inside the default 09:30-11:00 window.
pub fn is_within_trading_window(now: NaiveTime) -> bool {
    TradingWindow::default().contains(now)
}

/// Current local wall-clock time.
pub fn local_time() -> NaiveTime {
    Local::now().time()
}
