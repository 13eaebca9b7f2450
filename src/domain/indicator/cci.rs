//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP)) / (0.015 * mean absolute deviation of TP)
//! over the trailing window, TP = typical price. A mean deviation of exactly
//! zero reports CCI = 0.

use crate::domain::candle::Candle;

pub const DEFAULT_PERIOD: usize = 20;
const LAMBERT_CONSTANT: f64 = 0.015;

pub fn calculate_cci(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let typical: Vec<f64> = candles[candles.len() - period..]
        .iter()
        .map(Candle::typical_price)
        .collect();
    let mean = typical.iter().sum::<f64>() / period as f64;
    let mean_deviation = typical.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;

    if mean_deviation == 0.0 {
        return Some(0.0);
    }

    let current = typical[period - 1];
    Some((current - mean) / (LAMBERT_CONSTANT * mean_deviation))
}
