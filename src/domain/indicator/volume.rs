//! Volume trend: how the latest candle's volume compares to the recent norm,
//! and which way price moved on it.

use crate::domain::candle::Candle;

pub const DEFAULT_PERIOD: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeTrend {
    pub current_volume: f64,
    pub average_volume: f64,
    /// current / average; 0 when the average is 0.
    pub strength: f64,
    pub price_change_pct: f64,
    pub direction: PriceDirection,
}

/// Compares the last candle against the mean of the `period` candles before it.
pub fn calculate_volume_trend(candles: &[Candle], period: usize) -> Option<VolumeTrend> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    let n = candles.len();
    let current = &candles[n - 1];
    let previous = &candles[n - 2];
    let history = &candles[n - 1 - period..n - 1];

    let average_volume = history.iter().map(|c| c.volume).sum::<f64>() / period as f64;
    let strength = if average_volume > 0.0 {
        current.volume / average_volume
    } else {
        0.0
    };

    let price_change_pct = if previous.close != 0.0 {
        (current.close - previous.close) / previous.close * 100.0
    } else {
        0.0
    };
    let direction = if current.close > previous.close {
        PriceDirection::Up
    } else if current.close < previous.close {
        PriceDirection::Down
    } else {
        PriceDirection::Flat
    };

    Some(VolumeTrend {
        current_volume: current.volume,
        average_volume,
        strength,
        price_change_pct,
        direction,
    })
}
