pub mod ema;
pub mod macd;

pub use ema::ema_series;
pub use macd::{crossovers_from_pairs, MacdIndicator, MacdPoint};
