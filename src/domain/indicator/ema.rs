//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Output length is `len - n + 1`; element 0 is the seed.

pub fn calculate_ema(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);

    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out.push(ema);

    for &price in &values[period..] {
        ema = price * k + ema * (1.0 - k);
        out.push(ema);
    }

    Some(out)
}

pub fn ema_last(values: &[f64], period: usize) -> Option<f64> {
    calculate_ema(values, period).and_then(|series| series.last().copied())
}
