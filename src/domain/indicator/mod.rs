//! Technical indicator library.
//!
//! Every calculation is a pure function of an immutable candle or price
//! series. A series that is too short for the requested parameters yields
//! `None`; that is the normal "not yet computable" outcome, never an error.
//!
//! - `IndicatorKind`: closed set of indicators, each with typed parameters
//! - `IndicatorReading`: the computed output of one kind on one series
//! - `compute`: exhaustive dispatch from kind to calculation

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod crossover;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod support_resistance;
pub mod volume;
pub mod williams;

use std::fmt;

use crate::domain::candle::{Candle, closes};
use bollinger::BollingerBands;
use crossover::{MaCrossover, MaKind};
use macd::MacdResult;
use stochastic::StochasticResult;
use support_resistance::{SupportResistance, SupportResistanceParams};
use volume::VolumeTrend;

/// Differences smaller than this count as equal in crossover tests.
pub const CROSS_EPSILON: f64 = 1e-9;

/// `a` was at or below `b` and is now strictly above it.
pub fn crossed_above(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a - prev_b <= CROSS_EPSILON && a - b > CROSS_EPSILON
}

/// `a` was at or above `b` and is now strictly below it.
pub fn crossed_below(prev_a: f64, prev_b: f64, a: f64, b: f64) -> bool {
    prev_a - prev_b >= -CROSS_EPSILON && a - b < -CROSS_EPSILON
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerParams {
    pub period: usize,
    pub multiplier: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: bollinger::DEFAULT_PERIOD,
            multiplier: bollinger::DEFAULT_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StochasticParams {
    pub k_period: usize,
    pub d_period: usize,
}

impl Default for StochasticParams {
    fn default() -> Self {
        Self {
            k_period: stochastic::DEFAULT_K_PERIOD,
            d_period: stochastic::DEFAULT_D_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaCrossoverParams {
    pub fast: usize,
    pub slow: usize,
    pub kind: MaKind,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        Self {
            fast: 9,
            slow: 21,
            kind: MaKind::Ema,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorKind {
    Sma { period: usize },
    Ema { period: usize },
    Rsi { period: usize },
    Macd(MacdParams),
    Bollinger(BollingerParams),
    Atr { period: usize },
    Cci { period: usize },
    Stochastic(StochasticParams),
    WilliamsR { period: usize },
    Volume { period: usize },
    MaCrossover(MaCrossoverParams),
    SupportResistance(SupportResistanceParams),
}

impl IndicatorKind {
    /// Whether the indicator produces two lines that can cross each other.
    pub fn has_signal_line(&self) -> bool {
        matches!(
            self,
            IndicatorKind::Macd(_) | IndicatorKind::MaCrossover(_) | IndicatorKind::Stochastic(_)
        )
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma { period } => write!(f, "SMA({})", period),
            IndicatorKind::Ema { period } => write!(f, "EMA({})", period),
            IndicatorKind::Rsi { period } => write!(f, "RSI({})", period),
            IndicatorKind::Macd(p) => write!(f, "MACD({},{},{})", p.fast, p.slow, p.signal),
            IndicatorKind::Bollinger(p) => write!(f, "BOLLINGER({},{})", p.period, p.multiplier),
            IndicatorKind::Atr { period } => write!(f, "ATR({})", period),
            IndicatorKind::Cci { period } => write!(f, "CCI({})", period),
            IndicatorKind::Stochastic(p) => write!(f, "STOCHASTIC({},{})", p.k_period, p.d_period),
            IndicatorKind::WilliamsR { period } => write!(f, "WILLIAMS({})", period),
            IndicatorKind::Volume { period } => write!(f, "VOLUME({})", period),
            IndicatorKind::MaCrossover(p) => {
                let kind = match p.kind {
                    MaKind::Sma => "SMA",
                    MaKind::Ema => "EMA",
                };
                write!(f, "MA_CROSS({},{},{})", p.fast, p.slow, kind)
            }
            IndicatorKind::SupportResistance(p) => write!(f, "SR({})", p.lookback),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorReading {
    Scalar(f64),
    Macd(MacdResult),
    Bollinger {
        bands: BollingerBands,
        close: f64,
    },
    Stochastic(StochasticResult),
    Volume(VolumeTrend),
    MaCrossover(MaCrossover),
    SupportResistance(Box<SupportResistance>),
}

impl IndicatorReading {
    /// The value compared against thresholds.
    ///
    /// MACD: histogram. Bollinger: %B of the latest close. Stochastic: %K.
    /// Volume: strength ratio. MA crossover: fast - slow spread.
    /// Support/resistance: event score (+2 breakout … -2 breakdown).
    pub fn primary(&self) -> f64 {
        match self {
            IndicatorReading::Scalar(v) => *v,
            IndicatorReading::Macd(m) => m.histogram,
            IndicatorReading::Bollinger { bands, close } => bands.percent_b(*close),
            IndicatorReading::Stochastic(s) => s.k,
            IndicatorReading::Volume(v) => v.strength,
            IndicatorReading::MaCrossover(c) => c.fast - c.slow,
            IndicatorReading::SupportResistance(sr) => sr.event_score(),
        }
    }

    /// `(line, signal)` pair for two-line indicators.
    pub fn lines(&self) -> Option<(f64, f64)> {
        match self {
            IndicatorReading::Macd(m) => Some((m.macd, m.signal)),
            IndicatorReading::Stochastic(s) => Some((s.k, s.d)),
            IndicatorReading::MaCrossover(c) => Some((c.fast, c.slow)),
            _ => None,
        }
    }
}

/// Computes `kind` on the full candle series. Recomputed from scratch on
/// every call; there is no incremental state.
pub fn compute(kind: &IndicatorKind, candles: &[Candle]) -> Option<IndicatorReading> {
    match kind {
        IndicatorKind::Sma { period } => {
            sma::sma_last(&closes(candles), *period).map(IndicatorReading::Scalar)
        }
        IndicatorKind::Ema { period } => {
            ema::ema_last(&closes(candles), *period).map(IndicatorReading::Scalar)
        }
        IndicatorKind::Rsi { period } => {
            rsi::calculate_rsi(&closes(candles), *period).map(IndicatorReading::Scalar)
        }
        IndicatorKind::Macd(p) => macd::calculate_macd(&closes(candles), p.fast, p.slow, p.signal)
            .map(IndicatorReading::Macd),
        IndicatorKind::Bollinger(p) => {
            let close = candles.last()?.close;
            bollinger::calculate_bollinger(&closes(candles), p.period, p.multiplier)
                .map(|bands| IndicatorReading::Bollinger { bands, close })
        }
        IndicatorKind::Atr { period } => {
            atr::calculate_atr(candles, *period).map(IndicatorReading::Scalar)
        }
        IndicatorKind::Cci { period } => {
            cci::calculate_cci(candles, *period).map(IndicatorReading::Scalar)
        }
        IndicatorKind::Stochastic(p) => {
            stochastic::calculate_stochastic(candles, p.k_period, p.d_period)
                .map(IndicatorReading::Stochastic)
        }
        IndicatorKind::WilliamsR { period } => {
            williams::calculate_williams_r(candles, *period).map(IndicatorReading::Scalar)
        }
        IndicatorKind::Volume { period } => {
            volume::calculate_volume_trend(candles, *period).map(IndicatorReading::Volume)
        }
        IndicatorKind::MaCrossover(p) => {
            crossover::calculate_ma_crossover(&closes(candles), p.fast, p.slow, p.kind)
                .map(IndicatorReading::MaCrossover)
        }
        IndicatorKind::SupportResistance(p) => {
            support_resistance::calculate_support_resistance(candles, p)
                .map(|sr| IndicatorReading::SupportResistance(Box::new(sr)))
        }
    }
}
