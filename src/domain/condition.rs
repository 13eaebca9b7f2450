//! Declarative entry conditions.
//!
//! A `Condition` pairs one indicator with one comparison:
//! - `Above`/`Below`/`Between`: static thresholds on the latest primary value
//! - `CrossingUp`/`CrossingDown`: the primary value crossed a threshold on the
//!   latest candle
//! - `BullishCrossover`/`BearishCrossover`: the indicator's own line crossed
//!   its signal line on the latest candle (two-line indicators only)

use std::fmt;

use crate::domain::indicator::IndicatorKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Above(f64),
    Below(f64),
    Between { lower: f64, upper: f64 },
    CrossingUp(f64),
    CrossingDown(f64),
    BullishCrossover,
    BearishCrossover,
}

impl Comparison {
    /// Crossovers need the previous sample as well as the latest one.
    pub fn needs_previous(&self) -> bool {
        matches!(
            self,
            Comparison::CrossingUp(_)
                | Comparison::CrossingDown(_)
                | Comparison::BullishCrossover
                | Comparison::BearishCrossover
        )
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Above(t) => write!(f, "ABOVE {}", t),
            Comparison::Below(t) => write!(f, "BELOW {}", t),
            Comparison::Between { lower, upper } => write!(f, "BETWEEN {} {}", lower, upper),
            Comparison::CrossingUp(t) => write!(f, "CROSSING_UP {}", t),
            Comparison::CrossingDown(t) => write!(f, "CROSSING_DOWN {}", t),
            Comparison::BullishCrossover => write!(f, "BULLISH_CROSSOVER"),
            Comparison::BearishCrossover => write!(f, "BEARISH_CROSSOVER"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub indicator: IndicatorKind,
    pub comparison: Comparison,
}

impl Condition {
    pub fn new(indicator: IndicatorKind, comparison: Comparison) -> Self {
        Self {
            indicator,
            comparison,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.indicator, self.comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::MacdParams;

    #[test]
    fn display_round_trips_through_dsl_spelling() {
        let cond = Condition::new(IndicatorKind::Rsi { period: 14 }, Comparison::Below(30.0));
        assert_eq!(cond.to_string(), "RSI(14) BELOW 30");

        let cond = Condition::new(
            IndicatorKind::Macd(MacdParams::default()),
            Comparison::BullishCrossover,
        );
        assert_eq!(cond.to_string(), "MACD(12,26,9) BULLISH_CROSSOVER");
    }

    #[test]
    fn crossovers_need_previous_sample() {
        assert!(Comparison::CrossingUp(50.0).needs_previous());
        assert!(Comparison::BearishCrossover.needs_previous());
        assert!(!Comparison::Above(1.0).needs_previous());
        assert!(
            !Comparison::Between {
                lower: 0.0,
                upper: 1.0
            }
            .needs_previous()
        );
    }
}
