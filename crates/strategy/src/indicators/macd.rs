use chrono::{DateTime, Utc};
use serde::Serialize;

use common::{Bar, CrossoverState};

use super::ema::ema_series;

/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period).
/// Emits one crossover state per input bar.
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// MACD and signal values for one bar. Both are `None` during warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdPoint {
    pub timestamp: DateTime<Utc>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
}

impl MacdPoint {
    /// MACD minus signal, once both lines exist.
    pub fn histogram(&self) -> Option<f64> {
        Some(self.macd? - self.signal?)
    }
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(
            fast < slow,
            "MACD fast period must be less than slow period"
        );
        Self { fast, slow, signal }
    }

    /// The conventional 12/26/9 configuration.
    pub fn standard() -> Self {
        Self::new(12, 26, 9)
    }

    /// Index of the first bar that can carry a crossover.
    pub fn warmup(&self) -> usize {
        self.slow + self.signal - 1
    }

    /// MACD and signal lines aligned with `closes` (oldest first).
    pub fn lines(&self, closes: &[f64]) -> Vec<(Option<f64>, Option<f64>)> {
        let fast = ema_series(closes, self.fast);
        let slow = ema_series(closes, self.slow);

        let macd: Vec<Option<f64>> = fast
            .iter()
            .zip(&slow)
            .map(|(f, s)| Some((*f)? - (*s)?))
            .collect();

        // The signal EMA runs over the defined part of the MACD line only.
        let first_defined = macd.iter().position(Option::is_some);
        let mut signal = vec![None; closes.len()];
        if let Some(start) = first_defined {
            let defined: Vec<f64> = macd[start..].iter().flatten().copied().collect();
            for (offset, value) in ema_series(&defined, self.signal).into_iter().enumerate() {
                signal[start + offset] = value;
            }
        }

        macd.into_iter().zip(signal).collect()
    }

    /// Timestamped MACD points for bars that all carry a usable close.
    pub fn points(&self, bars: &[&Bar]) -> Vec<MacdPoint> {
        let closes: Vec<f64> = bars.iter().filter_map(|b| b.usable_close()).collect();
        debug_assert_eq!(closes.len(), bars.len(), "points() expects usable bars");
        self.lines(&closes)
            .into_iter()
            .zip(bars)
            .map(|((macd, signal), bar)| MacdPoint {
                timestamp: bar.timestamp,
                macd,
                signal,
            })
            .collect()
    }

    /// One crossover state per close.
    pub fn crossovers(&self, closes: &[f64]) -> Vec<CrossoverState> {
        let diffs: Vec<Option<f64>> = self
            .lines(closes)
            .into_iter()
            .map(|(m, s)| Some(m? - s?))
            .collect();
        crossovers_from_diffs(&diffs)
    }
}

/// Crossover states for hand-built `(macd, signal)` pairs.
pub fn crossovers_from_pairs(pairs: &[(f64, f64)]) -> Vec<CrossoverState> {
    let diffs: Vec<Option<f64>> = pairs.iter().map(|(m, s)| Some(m - s)).collect();
    crossovers_from_diffs(&diffs)
}

fn crossovers_from_diffs(diffs: &[Option<f64>]) -> Vec<CrossoverState> {
    let mut states = Vec::with_capacity(diffs.len());
    if diffs.is_empty() {
        return states;
    }
    // No prior bar for the first point.
    states.push(CrossoverState::None);
    states.extend(diffs.windows(2).map(|w| classify(w[0], w[1])));
    states
}

fn classify(prev: Option<f64>, curr: Option<f64>) -> CrossoverState {
    match (prev, curr) {
        (Some(p), Some(c)) if p <= 0.0 && c > 0.0 => CrossoverState::BullCross,
        (Some(p), Some(c)) if p >= 0.0 && c < 0.0 => CrossoverState::BearCross,
        _ => CrossoverState::None,
    }
}
