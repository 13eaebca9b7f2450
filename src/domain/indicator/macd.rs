//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of the MACD line history
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9.
//!
//! Needs `slow` closes. While the MACD history is shorter than the signal
//! period the signal line sits on the zero line, and a MACD value before the
//! first computable one reads as zero. A crossover is
//! `prev_macd <= prev_signal && macd > signal` (bullish) or the mirror image,
//! with differences inside `CROSS_EPSILON` treated as equal.
//!
//! At exactly `slow` closes there is no earlier MACD sample, so the previous
//! pair is the zero line and any non-zero first value reports a crossover.
//! The condition evaluator recomputes the previous sample on the series minus
//! its last close, which is not computable there, so `MACD BULLISH_CROSSOVER`
//! stays false on that first bar while the scorer's MACD vote can fire.

use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::{crossed_above, crossed_below};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub prev_macd: f64,
    pub prev_signal: f64,
    pub bullish_crossover: bool,
    pub bearish_crossover: bool,
}

/// MACD line history aligned to the slow EMA: one value per close from
/// index `slow - 1` onwards.
pub fn macd_line(closes: &[f64], fast: usize, slow: usize) -> Option<Vec<f64>> {
    if fast == 0 || fast >= slow {
        return None;
    }
    let ema_fast = calculate_ema(closes, fast)?;
    let ema_slow = calculate_ema(closes, slow)?;
    let offset = slow - fast;

    Some(
        ema_slow
            .iter()
            .enumerate()
            .map(|(i, slow_value)| ema_fast[i + offset] - slow_value)
            .collect(),
    )
}

pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Option<MacdResult> {
    if signal_period == 0 {
        return None;
    }
    let line = macd_line(closes, fast, slow)?;
    let n = line.len();

    // signal_history[j] belongs to line[j + signal_period - 1]
    let signal_history = calculate_ema(&line, signal_period).unwrap_or_default();
    let signal_at = |idx: usize| -> f64 {
        if idx + 1 < signal_period {
            0.0
        } else {
            signal_history[idx + 1 - signal_period]
        }
    };

    let macd = line[n - 1];
    let signal = signal_at(n - 1);
    let (prev_macd, prev_signal) = if n >= 2 {
        (line[n - 2], signal_at(n - 2))
    } else {
        (0.0, 0.0)
    };

    Some(MacdResult {
        macd,
        signal,
        histogram: macd - signal,
        prev_macd,
        prev_signal,
        bullish_crossover: crossed_above(prev_macd, prev_signal, macd, signal),
        bearish_crossover: crossed_below(prev_macd, prev_signal, macd, signal),
    })
}

pub fn calculate_macd_default(closes: &[f64]) -> Option<MacdResult> {
    calculate_macd(closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
