use std::collections::HashMap;

use tracing::info;

use common::CrossoverState;

use crate::config::StrategyConfig;
use crate::indicators::MacdIndicator;
use crate::Strategy;

/// Build the configured strategy. Unknown types and invalid periods are errors.
pub fn build_strategy(cfg: &StrategyConfig) -> Result<Box<dyn Strategy>, String> {
    let strategy: Box<dyn Strategy> = match cfg.strategy_type.as_str() {
        "macd" => {
            let fast = param_usize(&cfg.params, "fast", 12);
            let slow = param_usize(&cfg.params, "slow", 26);
            let signal = param_usize(&cfg.params, "signal", 9);
            if fast == 0 || signal == 0 {
                return Err(format!("periods must be positive (fast={fast}, signal={signal})"));
            }
            if fast >= slow {
                return Err(format!("fast period {fast} must be below slow period {slow}"));
            }
            Box::new(MacdCrossStrategy::new(cfg.name.clone(), fast, slow, signal))
        }
        other => return Err(format!("unknown type '{other}'")),
    };
    info!(name = %strategy.name(), "Built strategy");
    Ok(strategy)
}

fn param_usize(params: &HashMap<String, toml::Value>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|v| v.as_integer())
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

// ─── Concrete strategy types ──────────────────────────────────────────────────

/// Enters on a bullish MACD/signal crossover, exits on a bearish one.
pub struct MacdCrossStrategy {
    name: String,
    indicator: MacdIndicator,
}

impl MacdCrossStrategy {
    pub fn new(name: String, fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            name,
            indicator: MacdIndicator::new(fast, slow, signal),
        }
    }

    pub fn indicator(&self) -> &MacdIndicator {
        &self.indicator
    }
}

impl Strategy for MacdCrossStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn warmup(&self) -> usize {
        self.indicator.warmup()
    }

    fn crossovers(&self, closes: &[f64]) -> Vec<CrossoverState> {
        self.indicator.crossovers(closes)
    }
}
