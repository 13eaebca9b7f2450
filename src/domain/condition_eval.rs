//! Condition evaluation against a candle series.
//!
//! # Evaluation Semantics
//!
//! - `ABOVE`/`BELOW`/`BETWEEN`: compare the latest primary value only
//!   (`BETWEEN` is inclusive on both ends)
//! - `CROSSING_UP`/`CROSSING_DOWN`: the indicator is computed twice, on the
//!   full series and on the series minus its last candle; the primary value
//!   must change side of the threshold exactly at that boundary
//! - `BULLISH_CROSSOVER`/`BEARISH_CROSSOVER`: same two-sample rule applied to
//!   the indicator's line pair; indicators without a signal line never cross
//! - Anything not computable evaluates to `false`
//!
//! Because the previous sample needs one extra candle, a crossover cannot
//! hold on the first computable bar. `macd::calculate_macd` instead compares
//! that bar against the zero line, so the two disagree there.

use crate::domain::candle::Candle;
use crate::domain::condition::{Comparison, Condition};
use crate::domain::indicator::{IndicatorReading, compute, crossed_above, crossed_below};

pub fn evaluate(condition: &Condition, candles: &[Candle]) -> bool {
    let Some(current) = compute(&condition.indicator, candles) else {
        return false;
    };

    match condition.comparison {
        Comparison::Above(threshold) => current.primary() > threshold,
        Comparison::Below(threshold) => current.primary() < threshold,
        Comparison::Between { lower, upper } => {
            let value = current.primary();
            value >= lower && value <= upper
        }
        Comparison::CrossingUp(threshold) => previous(condition, candles).is_some_and(|prev| {
            crossed_above(prev.primary(), threshold, current.primary(), threshold)
        }),
        Comparison::CrossingDown(threshold) => previous(condition, candles).is_some_and(|prev| {
            crossed_below(prev.primary(), threshold, current.primary(), threshold)
        }),
        Comparison::BullishCrossover => line_cross(condition, candles, &current, crossed_above),
        Comparison::BearishCrossover => line_cross(condition, candles, &current, crossed_below),
    }
}

/// True only when every condition holds. An empty list never holds.
pub fn evaluate_all(conditions: &[Condition], candles: &[Candle]) -> bool {
    !conditions.is_empty() && conditions.iter().all(|c| evaluate(c, candles))
}

fn previous(condition: &Condition, candles: &[Candle]) -> Option<IndicatorReading> {
    let (_, head) = candles.split_last()?;
    compute(&condition.indicator, head)
}

fn line_cross(
    condition: &Condition,
    candles: &[Candle],
    current: &IndicatorReading,
    crossed: fn(f64, f64, f64, f64) -> bool,
) -> bool {
    if !condition.indicator.has_signal_line() {
        return false;
    }
    let Some((line, signal)) = current.lines() else {
        return false;
    };
    previous(condition, candles)
        .and_then(|prev| prev.lines())
        .is_some_and(|(prev_line, prev_signal)| crossed(prev_line, prev_signal, line, signal))
}
