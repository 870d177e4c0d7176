pub mod config;
pub mod indicators;
pub mod registry;

pub use config::StrategyConfig;
pub use indicators::{crossovers_from_pairs, MacdIndicator, MacdPoint};
pub use registry::{build_strategy, MacdCrossStrategy};

use common::CrossoverState;

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Number of leading bars that can never carry a crossover.
    fn warmup(&self) -> usize;

    /// One crossover state per close (oldest first).
    ///
    /// The output length always equals `closes.len()`.
    fn crossovers(&self, closes: &[f64]) -> Vec<CrossoverState>;
}
