//! Average True Range.
//!
//! TR[0] = high - low (no previous close), TR[i] = Candle::true_range(close[i-1]).
//! Seed is the simple mean of the first n true ranges, then Wilder smoothing:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.

use crate::domain::candle::Candle;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let tr_values: Vec<f64> = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            if i == 0 {
                candle.high - candle.low
            } else {
                candle.true_range(candles[i - 1].close)
            }
        })
        .collect();

    let mut atr = tr_values[..period].iter().sum::<f64>() / period as f64;
    for tr in &tr_values[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
    }
    Some(atr)
}

/// ATR as a percentage of the latest close; the scorer's volatility gauge.
pub fn atr_percent(candles: &[Candle], period: usize) -> Option<f64> {
    let atr = calculate_atr(candles, period)?;
    let close = candles.last()?.close;
    if close == 0.0 {
        return None;
    }
    Some(atr / close * 100.0)
}
