//! Stochastic oscillator.
//!
//! %K = (close - lowest low) / (highest high - lowest low) * 100 over k_period,
//! %D = SMA(d_period) of %K. A zero range in the latest window reads as the
//! neutral 50 for both %K and %D.
//! Needs k_period + d_period - 1 candles.

use crate::domain::candle::Candle;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticResult {
    pub k: f64,
    pub d: f64,
}

pub(crate) fn range_extremes(window: &[Candle]) -> (f64, f64) {
    window.iter().fold((f64::MAX, f64::MIN), |(low, high), c| {
        (low.min(c.low), high.max(c.high))
    })
}

fn percent_k(window: &[Candle]) -> f64 {
    let (lowest, highest) = range_extremes(window);
    let range = highest - lowest;
    if range == 0.0 {
        return 50.0;
    }
    let close = window[window.len() - 1].close;
    (close - lowest) / range * 100.0
}

pub fn calculate_stochastic(
    candles: &[Candle],
    k_period: usize,
    d_period: usize,
) -> Option<StochasticResult> {
    if k_period == 0 || d_period == 0 || candles.len() < k_period + d_period - 1 {
        return None;
    }

    let n = candles.len();
    let (lowest, highest) = range_extremes(&candles[n - k_period..]);
    if highest - lowest == 0.0 {
        return Some(StochasticResult { k: 50.0, d: 50.0 });
    }

    let k_values: Vec<f64> = (0..d_period)
        .rev()
        .map(|back| {
            let end = n - back;
            percent_k(&candles[end - k_period..end])
        })
        .collect();

    let k = k_values[d_period - 1];
    let d = k_values.iter().sum::<f64>() / d_period as f64;
    Some(StochasticResult { k, d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_candles(rows: &[(f64, f64, f64)]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| Candle {
                timestamp: start + Duration::minutes(i as i64),
                open: close,
                high,
                low,
                close,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn zero_range_is_neutral() {
        let candles = make_candles(&[(10.0, 10.0, 10.0); 20]);
        let result = calculate_stochastic(&candles, 14, 3).unwrap();
        assert_eq!(result.k, 50.0);
        assert_eq!(result.d, 50.0);
    }

    #[test]
    fn flat_latest_window_is_neutral_for_both_lines() {
        let mut rows = vec![(130.0, 80.0, 100.0); 2];
        rows.extend([(100.0, 100.0, 100.0); 14]);
        let result = calculate_stochastic(&make_candles(&rows), 14, 3).unwrap();
        assert_eq!(result.k, 50.0);
        assert_eq!(result.d, 50.0);
    }

    #[test]
    fn close_at_high_is_100() {
        let candles = make_candles(&[(12.0, 8.0, 10.0), (12.0, 8.0, 11.0), (12.0, 8.0, 12.0)]);
        let result = calculate_stochastic(&candles, 3, 1).unwrap();
        assert_eq!(result.k, 100.0);
        assert_eq!(result.d, 100.0);
    }

    #[test]
    fn d_is_average_of_recent_k() {
        // window of 2 for %K, 2 %K values averaged
        let candles = make_candles(&[(10.0, 0.0, 5.0), (10.0, 0.0, 10.0), (10.0, 0.0, 0.0)]);
        let result = calculate_stochastic(&candles, 2, 2).unwrap();
        assert_eq!(result.k, 0.0);
        assert_eq!(result.d, 50.0);
    }

    #[test]
    fn insufficient_data() {
        let candles = make_candles(&[(10.0, 9.0, 9.5); 15]);
        assert!(calculate_stochastic(&candles, 14, 3).is_none());
        assert!(calculate_stochastic(&candles, 0, 3).is_none());
    }
}
