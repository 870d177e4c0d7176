use serde::Serialize;
use thiserror::Error;

use common::PriceSeries;

/// Short-term trend of a symbol over the screening window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// Bullish only on a strict gain; an unchanged price counts as Bearish.
    pub fn from_prices(first: f64, last: f64) -> Self {
        if last > first {
            Direction::Bullish
        } else {
            Direction::Bearish
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Bullish => write!(f, "Bullish"),
            Direction::Bearish => write!(f, "Bearish"),
        }
    }
}

/// Why a symbol was left out of a screen.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("empty series")]
    EmptySeries,

    #[error("series has a missing close")]
    MissingClose,

    #[error("only {0} close(s), need at least 2")]
    InsufficientData(usize),

    #[error("non-finite {0}")]
    NonFiniteStatistic(&'static str),

    #[error("no volume reported")]
    MissingVolume,
}

/// Everything the screen needs to know about one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolStats {
    pub symbol: String,
    pub first_price: f64,
    pub last_price: f64,
    pub direction: Direction,
    pub volatility: f64,
    pub avg_volume: f64,
}

/// Derive screening statistics from a trailing price series.
pub fn derive_stats(series: &PriceSeries) -> Result<SymbolStats, SkipReason> {
    if series.is_empty() {
        return Err(SkipReason::EmptySeries);
    }
    let closes = series.closes().ok_or(SkipReason::MissingClose)?;
    if closes.len() < 2 {
        return Err(SkipReason::InsufficientData(closes.len()));
    }

    let first_price = closes[0];
    let last_price = closes[closes.len() - 1];
    if !first_price.is_finite() || !last_price.is_finite() {
        return Err(SkipReason::NonFiniteStatistic("price"));
    }

    let volatility = pct_change_volatility(&closes)
        .ok_or(SkipReason::NonFiniteStatistic("volatility"))?;
    let avg_volume = average_volume(series).ok_or(SkipReason::MissingVolume)?;

    Ok(SymbolStats {
        symbol: series.symbol.clone(),
        first_price,
        last_price,
        direction: Direction::from_prices(first_price, last_price),
        volatility,
        avg_volume,
    })
}

/// Sample standard deviation of close-to-close percentage changes.
///
/// A two-close window has a single change; its magnitude is used as the
/// volatility. Returns `None` when any change is non-finite (e.g. a zero close).
pub fn pct_change_volatility(closes: &[f64]) -> Option<f64> {
    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    if changes.is_empty() || changes.iter().any(|c| !c.is_finite()) {
        return None;
    }
    if changes.len() == 1 {
        return Some(changes[0].abs());
    }

    let n = changes.len() as f64;
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    std.is_finite().then_some(std)
}

/// Mean of the volumes that are present; missing bars are ignored.
fn average_volume(series: &PriceSeries) -> Option<f64> {
    let volumes: Vec<f64> = series
        .bars
        .iter()
        .filter_map(|b| b.volume)
        .filter(|v| v.is_finite())
        .collect();
    if volumes.is_empty() {
        return None;
    }
    Some(volumes.iter().sum::<f64>() / volumes.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::Bar;

    fn series(closes: &[Option<f64>], volume: Option<f64>) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| Bar {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1 + i as u32, 0, 0, 0).unwrap(),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume,
            })
            .collect();
        PriceSeries::new("TEST", bars)
    }

    #[test]
    fn direction_requires_strict_gain() {
        assert_eq!(Direction::from_prices(10.0, 10.5), Direction::Bullish);
        assert_eq!(Direction::from_prices(10.0, 10.0), Direction::Bearish);
        assert_eq!(Direction::from_prices(10.0, 9.0), Direction::Bearish);
    }

    #[test]
    fn volatility_is_sample_std_of_pct_changes() {
        // changes: +10%, -10%, +10% → mean 0.0333.., sample std = 0.11547..
        let vol = pct_change_volatility(&[100.0, 110.0, 99.0, 108.9]).unwrap();
        assert!((vol - 0.115_470_053_8).abs() < 1e-9, "got {vol}");
    }

    #[test]
    fn duplicate_timestamps_keep_provider_order() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let bars = [3.0, 3.3, 3.1]
            .iter()
            .map(|c| Bar {
                timestamp: at,
                open: Some(*c),
                high: Some(*c),
                low: Some(*c),
                close: Some(*c),
                volume: Some(800_000.0),
            })
            .collect();
        let stats = derive_stats(&PriceSeries::new("DUP", bars)).unwrap();

        assert_eq!(stats.first_price, 3.0);
        assert_eq!(stats.last_price, 3.1);
        assert_eq!(stats.direction, Direction::Bullish);
        assert!(stats.volatility > 0.0);
    }

    #[test]
    fn two_closes_use_change_magnitude() {
        assert_eq!(pct_change_volatility(&[2.0, 2.5]), Some(0.25));
        assert_eq!(pct_change_volatility(&[1.0, 1.0]), Some(0.0));
    }

    #[test]
    fn zero_close_makes_volatility_undefined() {
        assert!(pct_change_volatility(&[0.0, 1.0, 2.0]).is_none());
    }

    #[test]
    fn stats_for_valid_series() {
        let s = series(&[Some(2.0), Some(2.2), Some(2.1), Some(2.4), Some(2.5)], Some(700_000.0));
        let stats = derive_stats(&s).unwrap();
        assert_eq!(stats.first_price, 2.0);
        assert_eq!(stats.last_price, 2.5);
        assert_eq!(stats.direction, Direction::Bullish);
        assert_eq!(stats.avg_volume, 700_000.0);
        assert!(stats.volatility > 0.0);
    }

    #[test]
    fn skip_reasons() {
        assert_eq!(derive_stats(&series(&[], Some(1.0))), Err(SkipReason::EmptySeries));
        assert_eq!(
            derive_stats(&series(&[Some(1.0), None, Some(2.0)], Some(1.0))),
            Err(SkipReason::MissingClose)
        );
        assert_eq!(
            derive_stats(&series(&[Some(1.0)], Some(1.0))),
            Err(SkipReason::InsufficientData(1))
        );
        assert_eq!(
            derive_stats(&series(&[Some(1.0), Some(2.0)], None)),
            Err(SkipReason::MissingVolume)
        );
        assert_eq!(
            derive_stats(&series(&[Some(0.0), Some(2.0)], Some(1.0))),
            Err(SkipReason::NonFiniteStatistic("volatility"))
        );
    }
}
