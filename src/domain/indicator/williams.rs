//! Williams %R.
//!
//! %R = (highest high - close) / (highest high - lowest low) * -100.
//! A zero range reads as -50.

use crate::domain::candle::Candle;
use crate::domain::indicator::stochastic::range_extremes;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_williams_r(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let window = &candles[candles.len() - period..];
    let (lowest, highest) = range_extremes(window);
    let range = highest - lowest;
    if range == 0.0 {
        return Some(-50.0);
    }
    let close = window[period - 1].close;
    Some((highest - close) / range * -100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn close_at_low_is_minus_100() {
        let candles = vec![candle(20.0, 10.0, 15.0), candle(18.0, 10.0, 10.0)];
        assert_eq!(calculate_williams_r(&candles, 2), Some(-100.0));
    }

    #[test]
    fn close_at_high_is_zero() {
        let candles = vec![candle(20.0, 10.0, 15.0), candle(20.0, 12.0, 20.0)];
        assert_eq!(calculate_williams_r(&candles, 2), Some(0.0));
    }

    #[test]
    fn zero_range_is_minus_50() {
        let candles = vec![candle(5.0, 5.0, 5.0); 14];
        assert_eq!(calculate_williams_r(&candles, 14), Some(-50.0));
    }

    #[test]
    fn insufficient_data() {
        assert!(calculate_williams_r(&[candle(1.0, 1.0, 1.0)], 14).is_none());
    }
}
