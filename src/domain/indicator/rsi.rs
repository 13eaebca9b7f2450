//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, including a perfectly flat series.
//!
//! Needs n + 1 closes (n price changes).

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, pair) in closes.windows(2).enumerate() {
        let change = pair[1] - pair[0];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };

        if i < period {
            avg_gain += gain;
            avg_loss += loss;
            if i == period - 1 {
                avg_gain /= period as f64;
                avg_loss /= period as f64;
            }
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rsi_insufficient_data() {
        assert!(calculate_rsi(&[], 14).is_none());
        assert!(calculate_rsi(&[100.0], 14).is_none());
        let fourteen: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_rsi(&fourteen, 14).is_none());
    }

    #[test]
    fn rsi_zero_period() {
        assert!(calculate_rsi(&[100.0, 101.0], 0).is_none());
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let rsi = calculate_rsi(&closes, 14).unwrap();
        assert!(
            (rsi - 100.0).abs() < f64::EPSILON,
            "RSI should be 100 when all gains"
        );
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let rsi = calculate_rsi(&closes, 14).unwrap();
        assert!(rsi.abs() < f64::EPSILON, "RSI should be 0 when all losses");
    }

    #[test]
    fn rsi_flat_series_reports_100() {
        let closes = vec![50.0; 30];
        assert_eq!(calculate_rsi(&closes, 14), Some(100.0));
    }

    #[test]
    fn rsi_known_calculation() {
        let closes = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let rsi = calculate_rsi(&closes, 14).unwrap();
        assert!(
            rsi > 50.0 && rsi < 100.0,
            "RSI should be in bullish territory"
        );
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // period 2: changes +2, -1, +3
        let closes = [10.0, 12.0, 11.0, 14.0];
        let avg_gain = ((2.0 + 0.0) / 2.0 * 1.0 + 3.0) / 2.0;
        let avg_loss = ((0.0 + 1.0) / 2.0 * 1.0 + 0.0) / 2.0;
        let expected = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
        let rsi = calculate_rsi(&closes, 2).unwrap();
        assert!((rsi - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_trends_toward_100_on_rising_series() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + i as f64 + if i % 5 == 0 { -0.5 } else { 0.0 })
            .collect();
        let early = calculate_rsi(&closes[..20], 14).unwrap();
        let late = calculate_rsi(&closes, 14).unwrap();
        assert!(late > 80.0);
        assert!(late >= early - 5.0);
    }

    proptest! {
        #[test]
        fn rsi_is_bounded(closes in proptest::collection::vec(0.01f64..10_000.0, 15..200)) {
            let rsi = calculate_rsi(&closes, 14).unwrap();
            prop_assert!((0.0..=100.0).contains(&rsi));
        }

        #[test]
        fn rsi_is_deterministic(closes in proptest::collection::vec(1.0f64..500.0, 15..80)) {
            prop_assert_eq!(calculate_rsi(&closes, 14), calculate_rsi(&closes, 14));
        }
    }
}
