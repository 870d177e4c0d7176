use serde::{Deserialize, Serialize};

use crate::stats::SymbolStats;

/// Filter applied to per-symbol statistics. `max_price` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreeningCriteria {
    pub min_price: f64,
    pub max_price: f64,
    pub min_volatility: f64,
    pub min_avg_volume: f64,
}

impl ScreeningCriteria {
    pub fn admits(&self, stats: &SymbolStats) -> bool {
        self.min_price <= stats.last_price
            && stats.last_price < self.max_price
            && stats.volatility > self.min_volatility
            && stats.avg_volume > self.min_avg_volume
    }
}

/// Volatility and liquidity floors shared by every bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_volatility: f64,
    pub min_avg_volume: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_volatility: 0.005,
            min_avg_volume: 500_000.0,
        }
    }
}

/// Half-open price range `[min, max)` used to segment the universe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub min: f64,
    pub max: f64,
}

impl PriceBucket {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The three ranges screened by default.
    pub fn defaults() -> Vec<PriceBucket> {
        vec![
            PriceBucket::new(0.0, 5.0),
            PriceBucket::new(5.0, 20.0),
            PriceBucket::new(20.0, 50.0),
        ]
    }

    pub fn criteria(&self, thresholds: &Thresholds) -> ScreeningCriteria {
        ScreeningCriteria {
            min_price: self.min,
            max_price: self.max,
            min_volatility: thresholds.min_volatility,
            min_avg_volume: thresholds.min_avg_volume,
        }
    }
}

impl std::fmt::Display for PriceBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Direction;

    fn stats(last_price: f64, volatility: f64, avg_volume: f64) -> SymbolStats {
        SymbolStats {
            symbol: "X".into(),
            first_price: last_price,
            last_price,
            direction: Direction::Bearish,
            volatility,
            avg_volume,
        }
    }

    #[test]
    fn bucket_is_half_open() {
        let c = PriceBucket::new(5.0, 20.0).criteria(&Thresholds::default());
        assert!(c.admits(&stats(5.0, 0.01, 600_000.0)));
        assert!(c.admits(&stats(19.99, 0.01, 600_000.0)));
        assert!(!c.admits(&stats(20.0, 0.01, 600_000.0)));
        assert!(!c.admits(&stats(4.99, 0.01, 600_000.0)));
    }

    #[test]
    fn thresholds_are_strict() {
        let c = PriceBucket::new(0.0, 5.0).criteria(&Thresholds::default());
        assert!(!c.admits(&stats(2.0, 0.005, 600_000.0)));
        assert!(!c.admits(&stats(2.0, 0.01, 500_000.0)));
        assert!(c.admits(&stats(2.0, 0.0051, 500_001.0)));
    }

    #[test]
    fn bucket_display() {
        assert_eq!(PriceBucket::new(0.0, 5.0).to_string(), "[0, 5)");
    }
}
