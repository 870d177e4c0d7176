use serde::Serialize;

use crate::stats::{Direction, SymbolStats};

/// Longest list produced for a single bucket.
pub const MAX_CANDIDATES: usize = 20;

/// A symbol that passed the screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub symbol: String,
    pub direction: Direction,
    pub volatility: f64,
    pub avg_volume: f64,
    pub last_price: f64,
}

impl From<&SymbolStats> for Candidate {
    fn from(stats: &SymbolStats) -> Self {
        Self {
            symbol: stats.symbol.clone(),
            direction: stats.direction,
            volatility: stats.volatility,
            avg_volume: stats.avg_volume,
            last_price: stats.last_price,
        }
    }
}

/// Ranked candidates for one bucket, at most [`MAX_CANDIDATES`] long.
pub type CandidateList = Vec<Candidate>;

/// Sort by volatility, then average volume (both descending), then symbol,
/// and keep the first [`MAX_CANDIDATES`].
pub fn rank(mut candidates: Vec<Candidate>) -> CandidateList {
    candidates.sort_by(|a, b| {
        b.volatility
            .total_cmp(&a.volatility)
            .then_with(|| b.avg_volume.total_cmp(&a.avg_volume))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    candidates.truncate(MAX_CANDIDATES);
    candidates
}
