//! Multi-indicator weighted voting.
//!
//! Each indicator family votes its fixed weight for one side only when its
//! reading is strong: a confirmed crossover, an extreme RSI, a band breached
//! beyond a buffer, a volume surge aligned with price, or a confirmed
//! support/resistance event. The resulting bullish/bearish pair then passes
//! three gates in order:
//!
//! 1. separation: `|bullish - bearish|` must reach the minimum (lower in a
//!    high-volatility regime); a tie never passes
//! 2. exhaustion veto: RSI beyond the extreme band in the favoured direction
//! 3. floor: the winning score must reach the absolute minimum
//!
//! `score` and `decide` are pure; there is no state between calls.

use std::fmt;

use crate::domain::candle::{Candle, closes};
use crate::domain::indicator::support_resistance::{
    SupportResistanceParams, calculate_support_resistance,
};
use crate::domain::indicator::volume::{PriceDirection, calculate_volume_trend};
use crate::domain::indicator::{
    BollingerParams, MaCrossoverParams, MacdParams, atr, bollinger::calculate_bollinger,
    crossover::calculate_ma_crossover, macd::calculate_macd, rsi::calculate_rsi,
};
use crate::domain::market::Side;

/// Confidence never exceeds this.
pub const MAX_CONFIDENCE: f64 = 95.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerConfig {
    pub macd: MacdParams,
    pub macd_weight: f64,

    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub rsi_weight: f64,

    pub bollinger: BollingerParams,
    /// How far past a band (percent of the band) the close must be.
    pub bollinger_buffer_pct: f64,
    pub bollinger_weight: f64,

    pub volume_period: usize,
    pub volume_multiplier: f64,
    pub volume_weight: f64,

    pub ma_crossover: MaCrossoverParams,
    pub ma_weight: f64,

    pub support_resistance: SupportResistanceParams,
    pub sr_breakout_weight: f64,
    pub sr_strong_weight: f64,
    pub sr_weak_weight: f64,
    /// Touches at which a level counts as strong.
    pub sr_strong_touches: usize,

    pub atr_period: usize,
    /// ATR as a percentage of price at or above which the market is treated
    /// as highly volatile.
    pub high_volatility_pct: f64,

    pub min_separation: f64,
    pub high_volatility_separation: f64,
    pub min_score: f64,
    pub rsi_exhaustion_high: f64,
    pub rsi_exhaustion_low: f64,
    pub min_candles: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            macd: MacdParams::default(),
            macd_weight: 40.0,
            rsi_period: 14,
            rsi_oversold: 25.0,
            rsi_overbought: 75.0,
            rsi_weight: 25.0,
            bollinger: BollingerParams::default(),
            bollinger_buffer_pct: 0.2,
            bollinger_weight: 20.0,
            volume_period: 20,
            volume_multiplier: 2.0,
            volume_weight: 20.0,
            ma_crossover: MaCrossoverParams::default(),
            ma_weight: 15.0,
            support_resistance: SupportResistanceParams::default(),
            sr_breakout_weight: 25.0,
            sr_strong_weight: 15.0,
            sr_weak_weight: 8.0,
            sr_strong_touches: 3,
            atr_period: 14,
            high_volatility_pct: 3.0,
            min_separation: 15.0,
            high_volatility_separation: 10.0,
            min_score: 20.0,
            rsi_exhaustion_high: 85.0,
            rsi_exhaustion_low: 15.0,
            min_candles: 35,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteSource {
    Macd,
    Rsi,
    Bollinger,
    Volume,
    MaCrossover,
    SupportResistance,
}

impl fmt::Display for VoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VoteSource::Macd => "macd",
            VoteSource::Rsi => "rsi",
            VoteSource::Bollinger => "bollinger",
            VoteSource::Volume => "volume",
            VoteSource::MaCrossover => "ma_crossover",
            VoteSource::SupportResistance => "support_resistance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub source: VoteSource,
    pub side: Side,
    pub weight: f64,
    pub reason: String,
}

/// Everything the scorer saw, kept for observability.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreSheet {
    pub bullish: f64,
    pub bearish: f64,
    pub votes: Vec<Vote>,
    pub rsi: Option<f64>,
    /// ATR as a percentage of the latest close.
    pub volatility_pct: Option<f64>,
}

impl ScoreSheet {
    pub fn add(&mut self, source: VoteSource, side: Side, weight: f64, reason: impl Into<String>) {
        match side {
            Side::Long => self.bullish += weight,
            Side::Short => self.bearish += weight,
        }
        self.votes.push(Vote {
            source,
            side,
            weight,
            reason: reason.into(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreDecision {
    pub bullish_score: f64,
    pub bearish_score: f64,
    pub direction: Side,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoSignalReason {
    InsufficientData,
    InsufficientSeparation { difference: f64, required: f64 },
    RsiExhaustion { rsi: f64, side: Side },
    BelowMinimumScore { score: f64, floor: f64 },
    ConditionsNotMet,
}

impl fmt::Display for NoSignalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoSignalReason::InsufficientData => write!(f, "insufficient data"),
            NoSignalReason::InsufficientSeparation {
                difference,
                required,
            } => write!(
                f,
                "score separation {:.1} below required {:.1}",
                difference, required
            ),
            NoSignalReason::RsiExhaustion { rsi, side } => {
                write!(f, "RSI {:.1} exhausted for {} entry", rsi, side)
            }
            NoSignalReason::BelowMinimumScore { score, floor } => {
                write!(f, "score {:.1} below floor {:.1}", score, floor)
            }
            NoSignalReason::ConditionsNotMet => write!(f, "entry conditions not met"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Signal(ScoreDecision),
    NoSignal(NoSignalReason),
}

impl Verdict {
    pub fn decision(&self) -> Option<&ScoreDecision> {
        match self {
            Verdict::Signal(d) => Some(d),
            Verdict::NoSignal(_) => None,
        }
    }
}

/// Collects the weighted votes for the latest candle. `None` when the
/// series is shorter than `min_candles`.
pub fn score(candles: &[Candle], config: &ScorerConfig) -> Option<ScoreSheet> {
    if candles.is_empty() || candles.len() < config.min_candles {
        return None;
    }
    let prices = closes(candles);
    let close = *prices.last()?;
    let mut sheet = ScoreSheet::default();

    if let Some(m) = calculate_macd(&prices, config.macd.fast, config.macd.slow, config.macd.signal)
    {
        if m.bullish_crossover {
            sheet.add(VoteSource::Macd, Side::Long, config.macd_weight, "bullish MACD crossover");
        } else if m.bearish_crossover {
            sheet.add(VoteSource::Macd, Side::Short, config.macd_weight, "bearish MACD crossover");
        }
    }

    sheet.rsi = calculate_rsi(&prices, config.rsi_period);
    if let Some(rsi) = sheet.rsi {
        if rsi < config.rsi_oversold {
            sheet.add(
                VoteSource::Rsi,
                Side::Long,
                config.rsi_weight,
                format!("RSI {:.1} oversold", rsi),
            );
        } else if rsi > config.rsi_overbought {
            sheet.add(
                VoteSource::Rsi,
                Side::Short,
                config.rsi_weight,
                format!("RSI {:.1} overbought", rsi),
            );
        }
    }

    if let Some(bands) =
        calculate_bollinger(&prices, config.bollinger.period, config.bollinger.multiplier)
    {
        let buffer = config.bollinger_buffer_pct / 100.0;
        if close < bands.lower * (1.0 - buffer) {
            sheet.add(
                VoteSource::Bollinger,
                Side::Long,
                config.bollinger_weight,
                "close below lower band",
            );
        } else if close > bands.upper * (1.0 + buffer) {
            sheet.add(
                VoteSource::Bollinger,
                Side::Short,
                config.bollinger_weight,
                "close above upper band",
            );
        }
    }

    if let Some(trend) = calculate_volume_trend(candles, config.volume_period)
        && trend.strength >= config.volume_multiplier
    {
        let reason = format!("volume {:.1}x average", trend.strength);
        match trend.direction {
            PriceDirection::Up => {
                sheet.add(VoteSource::Volume, Side::Long, config.volume_weight, reason)
            }
            PriceDirection::Down => {
                sheet.add(VoteSource::Volume, Side::Short, config.volume_weight, reason)
            }
            PriceDirection::Flat => {}
        }
    }

    let ma = &config.ma_crossover;
    if let Some(cross) = calculate_ma_crossover(&prices, ma.fast, ma.slow, ma.kind) {
        if cross.bullish_crossover {
            sheet.add(
                VoteSource::MaCrossover,
                Side::Long,
                config.ma_weight,
                "fast MA crossed above slow",
            );
        } else if cross.bearish_crossover {
            sheet.add(
                VoteSource::MaCrossover,
                Side::Short,
                config.ma_weight,
                "fast MA crossed below slow",
            );
        }
    }

    if let Some(sr) = calculate_support_resistance(candles, &config.support_resistance) {
        let level_weight = |touches: usize| {
            if touches >= config.sr_strong_touches {
                config.sr_strong_weight
            } else {
                config.sr_weak_weight
            }
        };
        let source = VoteSource::SupportResistance;
        if sr.breakout {
            sheet.add(source, Side::Long, config.sr_breakout_weight, "resistance breakout");
        } else if sr.breakdown {
            sheet.add(source, Side::Short, config.sr_breakout_weight, "support breakdown");
        } else if let (true, Some(level)) = (sr.support_bounce, sr.support) {
            let reason = format!("bounce off support {:.4}", level.price);
            sheet.add(source, Side::Long, level_weight(level.touches), reason);
        } else if let (true, Some(level)) = (sr.resistance_rejection, sr.resistance) {
            let reason = format!("rejected at resistance {:.4}", level.price);
            sheet.add(source, Side::Short, level_weight(level.touches), reason);
        }
    }

    sheet.volatility_pct = atr::atr_percent(candles, config.atr_period);
    Some(sheet)
}

/// Applies the separation, exhaustion and floor gates to a score sheet.
pub fn decide(sheet: &ScoreSheet, config: &ScorerConfig) -> Verdict {
    let bullish = sheet.bullish;
    let bearish = sheet.bearish;
    let difference = (bullish - bearish).abs();
    let high_volatility = sheet
        .volatility_pct
        .is_some_and(|v| v >= config.high_volatility_pct);
    let required = if high_volatility {
        config.high_volatility_separation
    } else {
        config.min_separation
    };

    if bullish == bearish || difference < required {
        return Verdict::NoSignal(NoSignalReason::InsufficientSeparation {
            difference,
            required,
        });
    }

    let direction = if bullish > bearish {
        Side::Long
    } else {
        Side::Short
    };

    if let Some(rsi) = sheet.rsi {
        let exhausted = match direction {
            Side::Long => rsi > config.rsi_exhaustion_high,
            Side::Short => rsi < config.rsi_exhaustion_low,
        };
        if exhausted {
            return Verdict::NoSignal(NoSignalReason::RsiExhaustion {
                rsi,
                side: direction,
            });
        }
    }

    let top = bullish.max(bearish);
    if top < config.min_score {
        return Verdict::NoSignal(NoSignalReason::BelowMinimumScore {
            score: top,
            floor: config.min_score,
        });
    }

    Verdict::Signal(ScoreDecision {
        bullish_score: bullish,
        bearish_score: bearish,
        direction,
        confidence: top.min(MAX_CONFIDENCE),
    })
}

/// `score` followed by `decide`.
pub fn evaluate(candles: &[Candle], config: &ScorerConfig) -> (Option<ScoreSheet>, Verdict) {
    match score(candles, config) {
        Some(sheet) => {
            let verdict = decide(&sheet, config);
            (Some(sheet), verdict)
        }
        None => (None, Verdict::NoSignal(NoSignalReason::InsufficientData)),
    }
}
