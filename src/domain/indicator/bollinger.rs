//! Bollinger Bands indicator.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation of the same window.
//! Default parameters: period=20, multiplier=2.0

use crate::domain::indicator::stddev::population_std_dev;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub std_dev: f64,
}

impl BollingerBands {
    /// Position of `price` inside the bands in percent (0 = lower, 100 = upper).
    /// Collapsed bands report the midpoint.
    pub fn percent_b(&self, price: f64) -> f64 {
        let width = self.upper - self.lower;
        if width == 0.0 {
            return 50.0;
        }
        (price - self.lower) / width * 100.0
    }

    pub fn bandwidth_pct(&self) -> f64 {
        if self.middle == 0.0 {
            return 0.0;
        }
        (self.upper - self.lower) / self.middle * 100.0
    }
}

pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    multiplier: f64,
) -> Option<BollingerBands> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let std_dev = population_std_dev(window)?;

    Some(BollingerBands {
        upper: middle + multiplier * std_dev,
        middle,
        lower: middle - multiplier * std_dev,
        std_dev,
    })
}
