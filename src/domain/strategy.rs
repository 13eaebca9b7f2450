//! Strategy configuration and composition.
//!
//! A strategy is either automatic (weighted multi-indicator scoring) or
//! declarative (a fixed direction plus a list of conditions that must all
//! hold). Conditions naming an indicator outside the supported set are kept
//! as unresolved entries: they are logged once here, at load, and make the
//! strategy fail closed on every evaluation.

use tracing::warn;

use crate::domain::candle::Candle;
use crate::domain::condition::Condition;
use crate::domain::condition_eval;
use crate::domain::condition_parser::{self, split_conditions};
use crate::domain::error::{ParseError, SignalError};
use crate::domain::indicator;
use crate::domain::market::Side;
use crate::domain::scorer::{
    self, MAX_CONFIDENCE, NoSignalReason, ScoreDecision, ScoreSheet, ScorerConfig, Verdict,
};

#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedCondition {
    pub source: String,
    pub error: ParseError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyMode {
    Automatic(ScorerConfig),
    Declarative {
        direction: Side,
        conditions: Vec<Condition>,
        unresolved: Vec<UnresolvedCondition>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub mode: StrategyMode,
}

impl Strategy {
    pub fn automatic(name: impl Into<String>, config: ScorerConfig) -> Self {
        Self {
            name: name.into(),
            mode: StrategyMode::Automatic(config),
        }
    }

    /// Parses a `;`-separated condition list. Unknown indicators become
    /// unresolved entries; any other syntax error rejects the strategy.
    pub fn declarative(
        name: impl Into<String>,
        direction: Side,
        entry_conditions: &str,
    ) -> Result<Self, SignalError> {
        let name = name.into();
        let mut conditions = Vec::new();
        let mut unresolved = Vec::new();

        for source in split_conditions(entry_conditions) {
            match condition_parser::parse(source) {
                Ok(condition) => conditions.push(condition),
                Err(error) if error.unknown_indicator.is_some() => {
                    warn!(
                        strategy = %name,
                        condition = source,
                        indicator = error.unknown_indicator.as_deref().unwrap_or_default(),
                        "unknown indicator, condition will always fail"
                    );
                    unresolved.push(UnresolvedCondition {
                        source: source.to_string(),
                        error,
                    });
                }
                Err(error) => return Err(SignalError::ConditionParse(error)),
            }
        }

        Ok(Self {
            name,
            mode: StrategyMode::Declarative {
                direction,
                conditions,
                unresolved,
            },
        })
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self.mode, StrategyMode::Automatic(_))
    }

    /// Scores the series (automatic) or checks every condition
    /// (declarative). Only automatic strategies produce a score sheet. A
    /// declarative condition whose indicator cannot be computed on the
    /// series reports insufficient data.
    pub fn assess(&self, candles: &[Candle]) -> (Option<ScoreSheet>, Verdict) {
        match &self.mode {
            StrategyMode::Automatic(config) => scorer::evaluate(candles, config),
            StrategyMode::Declarative {
                direction,
                conditions,
                unresolved,
            } => {
                if candles.is_empty()
                    || conditions
                        .iter()
                        .any(|c| indicator::compute(&c.indicator, candles).is_none())
                {
                    return (None, Verdict::NoSignal(NoSignalReason::InsufficientData));
                }
                if !unresolved.is_empty() || !condition_eval::evaluate_all(conditions, candles) {
                    return (None, Verdict::NoSignal(NoSignalReason::ConditionsNotMet));
                }
                let (bullish_score, bearish_score) = match direction {
                    Side::Long => (MAX_CONFIDENCE, 0.0),
                    Side::Short => (0.0, MAX_CONFIDENCE),
                };
                let decision = ScoreDecision {
                    bullish_score,
                    bearish_score,
                    direction: *direction,
                    confidence: MAX_CONFIDENCE,
                };
                (None, Verdict::Signal(decision))
            }
        }
    }
}
