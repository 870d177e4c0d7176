//! Momentum screening over a universe of symbols.
//!
//! Each symbol's trailing window is reduced to [`SymbolStats`] (direction,
//! close-to-close volatility, average volume). Those stats are filtered
//! through per-bucket [`ScreeningCriteria`] and ranked into a capped
//! [`CandidateList`]. [`TradingWindow`] gates when a screen may run at all.

pub mod criteria;
pub mod gate;
pub mod rank;
pub mod scan;
pub mod stats;

pub use criteria::{PriceBucket, ScreeningCriteria, Thresholds};
pub use gate::{is_within_trading_window, local_time, TradingWindow};
pub use rank::{rank, Candidate, CandidateList, MAX_CANDIDATES};
pub use scan::{select, BucketScreen, Screener};
pub use stats::{derive_stats, pct_change_volatility, Direction, SkipReason, SymbolStats};
