//! Population standard deviation (divides by N, not N-1).

pub fn population_std_dev(window: &[f64]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / window.len() as f64;
    Some(variance.sqrt())
}

/// Standard deviation of the trailing `period` values.
pub fn calculate_stddev(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    population_std_dev(&values[values.len() - period..])
}
