/// Exponential moving average over `values`, aligned with the input.
///
/// EMA[t] = k * value[t] + (1 - k) * EMA[t-1], with k = 2 / (period + 1).
/// Seeded with the simple mean of the first `period` values, so the first
/// `period - 1` outputs are `None`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for (i, &value) in values.iter().enumerate().skip(period) {
        ema = value * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}
