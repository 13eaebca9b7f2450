//! Fast/slow moving-average crossover.

use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::{crossed_above, crossed_below};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaKind {
    Sma,
    Ema,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaCrossover {
    pub fast: f64,
    pub slow: f64,
    pub prev_fast: f64,
    pub prev_slow: f64,
    pub bullish_crossover: bool,
    pub bearish_crossover: bool,
}

/// Needs `slow + 1` closes so both averages have a previous value.
pub fn calculate_ma_crossover(
    closes: &[f64],
    fast: usize,
    slow: usize,
    kind: MaKind,
) -> Option<MaCrossover> {
    if fast == 0 || fast >= slow || closes.len() < slow + 1 {
        return None;
    }
    let average = |period: usize| match kind {
        MaKind::Sma => calculate_sma(closes, period),
        MaKind::Ema => calculate_ema(closes, period),
    };
    let fast_series = average(fast)?;
    let slow_series = average(slow)?;

    let (f, s) = (fast_series.len(), slow_series.len());
    let (fast_now, prev_fast) = (fast_series[f - 1], fast_series[f - 2]);
    let (slow_now, prev_slow) = (slow_series[s - 1], slow_series[s - 2]);

    Some(MaCrossover {
        fast: fast_now,
        slow: slow_now,
        prev_fast,
        prev_slow,
        bullish_crossover: crossed_above(prev_fast, prev_slow, fast_now, slow_now),
        bearish_crossover: crossed_below(prev_fast, prev_slow, fast_now, slow_now),
    })
}
