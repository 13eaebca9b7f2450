//! Simple Moving Average.
//!
//! SMA[i] = mean(values[i..i+n]), computed with a sliding window sum.
//! Output length is `len - n + 1`; `None` when the series is shorter than `n`.

pub fn calculate_sma(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }

    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    out.push(sum / period as f64);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(sum / period as f64);
    }

    Some(out)
}

/// Mean of the trailing `period` values.
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sma_length_and_values() {
        let series = calculate_sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(series.len(), 3);
        assert_abs_diff_eq!(series[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(series[1], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(series[2], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn sma_insufficient_data() {
        assert!(calculate_sma(&[1.0, 2.0], 3).is_none());
        assert!(calculate_sma(&[], 1).is_none());
    }

    #[test]
    fn sma_period_zero() {
        assert!(calculate_sma(&[1.0, 2.0], 0).is_none());
        assert!(sma_last(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn sma_last_matches_series_tail() {
        let values = [10.0, 11.0, 13.0, 17.0, 19.0, 23.0];
        let series = calculate_sma(&values, 4).unwrap();
        let last = sma_last(&values, 4).unwrap();
        assert_abs_diff_eq!(*series.last().unwrap(), last, epsilon = 1e-9);
    }
}
