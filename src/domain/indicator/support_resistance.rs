//! Support and resistance levels from clustered swing pivots.
//!
//! A pivot low is a candle whose low is strictly below the lows of `pivot_span`
//! neighbours on each side (pivot high: mirror image). Pivots whose prices sit
//! within `cluster_tolerance_pct` of a running cluster mean merge into one
//! level; a level's strength counts its touches plus the volume traded on
//! them relative to the window average. Only levels with at least
//! `min_touches` pivots qualify.
//!
//! The latest candle is never a pivot candidate: it is the candle being judged
//! for bounce, rejection, breakout and breakdown, each of which also needs a
//! volume surge on that candle.

use crate::domain::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportResistanceParams {
    pub lookback: usize,
    pub pivot_span: usize,
    pub cluster_tolerance_pct: f64,
    pub near_pct: f64,
    pub min_touches: usize,
    pub volume_period: usize,
    pub volume_surge_multiplier: f64,
}

impl Default for SupportResistanceParams {
    fn default() -> Self {
        Self {
            lookback: 100,
            pivot_span: 2,
            cluster_tolerance_pct: 0.75,
            near_pct: 1.0,
            min_touches: 2,
            volume_period: 20,
            volume_surge_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub price: f64,
    pub touches: usize,
    pub volume: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupportResistance {
    pub levels: Vec<Level>,
    pub support: Option<Level>,
    pub resistance: Option<Level>,
    pub support_distance_pct: Option<f64>,
    pub resistance_distance_pct: Option<f64>,
    pub near_support: bool,
    pub near_resistance: bool,
    pub volume_surge: bool,
    pub support_bounce: bool,
    pub resistance_rejection: bool,
    pub breakout: bool,
    pub breakdown: bool,
}

impl SupportResistance {
    /// +2 breakout, +1 bounce, -1 rejection, -2 breakdown, 0 otherwise.
    pub fn event_score(&self) -> f64 {
        if self.breakout {
            2.0
        } else if self.breakdown {
            -2.0
        } else if self.support_bounce {
            1.0
        } else if self.resistance_rejection {
            -1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pivot {
    price: f64,
    volume: f64,
}

fn find_pivots(history: &[Candle], span: usize) -> Vec<Pivot> {
    let mut pivots = Vec::new();
    if history.len() < 2 * span + 1 {
        return pivots;
    }
    for i in span..history.len() - span {
        let c = &history[i];
        let is_low = (1..=span).all(|j| c.low < history[i - j].low && c.low < history[i + j].low);
        let is_high =
            (1..=span).all(|j| c.high > history[i - j].high && c.high > history[i + j].high);
        if is_low {
            pivots.push(Pivot {
                price: c.low,
                volume: c.volume,
            });
        }
        if is_high {
            pivots.push(Pivot {
                price: c.high,
                volume: c.volume,
            });
        }
    }
    pivots
}

fn cluster_levels(mut pivots: Vec<Pivot>, tolerance_pct: f64, average_volume: f64) -> Vec<Level> {
    pivots.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut clusters: Vec<Vec<Pivot>> = Vec::new();
    for pivot in pivots {
        let joins_last = clusters.last().is_some_and(|cluster| {
            let mean = cluster.iter().map(|p| p.price).sum::<f64>() / cluster.len() as f64;
            mean != 0.0 && (pivot.price - mean).abs() / mean * 100.0 <= tolerance_pct
        });
        match clusters.last_mut() {
            Some(cluster) if joins_last => cluster.push(pivot),
            _ => clusters.push(vec![pivot]),
        }
    }

    clusters
        .into_iter()
        .map(|cluster| {
            let touches = cluster.len();
            let price = cluster.iter().map(|p| p.price).sum::<f64>() / touches as f64;
            let volume = cluster.iter().map(|p| p.volume).sum::<f64>();
            let volume_weight = if average_volume > 0.0 {
                volume / average_volume
            } else {
                0.0
            };
            Level {
                price,
                touches,
                volume,
                strength: touches as f64 + volume_weight,
            }
        })
        .collect()
}

fn nearest_below(levels: &[Level], price: f64) -> Option<Level> {
    levels
        .iter()
        .filter(|l| l.price <= price)
        .max_by(|a, b| a.price.total_cmp(&b.price))
        .copied()
}

fn nearest_above(levels: &[Level], price: f64) -> Option<Level> {
    levels
        .iter()
        .filter(|l| l.price > price)
        .min_by(|a, b| a.price.total_cmp(&b.price))
        .copied()
}

pub fn calculate_support_resistance(
    candles: &[Candle],
    params: &SupportResistanceParams,
) -> Option<SupportResistance> {
    let span = params.pivot_span.max(1);
    if candles.len() < 2 * span + 2 || params.lookback < 2 * span + 2 {
        return None;
    }

    let window = &candles[candles.len().saturating_sub(params.lookback)..];
    let (history, current) = window.split_at(window.len() - 1);
    let current = &current[0];
    let prev_close = history[history.len() - 1].close;

    let window_average =
        history.iter().map(|c| c.volume).sum::<f64>() / history.len() as f64;
    let levels: Vec<Level> = cluster_levels(
        find_pivots(history, span),
        params.cluster_tolerance_pct,
        window_average,
    )
    .into_iter()
    .filter(|l| l.touches >= params.min_touches)
    .collect();

    let volume_tail = &history[history.len().saturating_sub(params.volume_period.max(1))..];
    let volume_average =
        volume_tail.iter().map(|c| c.volume).sum::<f64>() / volume_tail.len() as f64;
    let volume_surge =
        volume_average > 0.0 && current.volume >= params.volume_surge_multiplier * volume_average;

    let close = current.close;
    let support = nearest_below(&levels, close);
    let resistance = nearest_above(&levels, close);

    let distance = |level: &Option<Level>| {
        level
            .as_ref()
            .filter(|_| close != 0.0)
            .map(|l| (close - l.price).abs() / close * 100.0)
    };
    let support_distance_pct = distance(&support);
    let resistance_distance_pct = distance(&resistance);
    let near_support = support_distance_pct.is_some_and(|d| d <= params.near_pct);
    let near_resistance = resistance_distance_pct.is_some_and(|d| d <= params.near_pct);

    let tolerance = params.cluster_tolerance_pct / 100.0;
    let support_bounce = volume_surge
        && near_support
        && current.is_bullish()
        && support.is_some_and(|s| current.low <= s.price * (1.0 + tolerance) && close > s.price);
    let resistance_rejection = volume_surge
        && near_resistance
        && current.is_bearish()
        && resistance
            .is_some_and(|r| current.high >= r.price * (1.0 - tolerance) && close < r.price);

    let breakout = volume_surge
        && nearest_above(&levels, prev_close).is_some_and(|r| close > r.price);
    let breakdown = volume_surge
        && nearest_below(&levels, prev_close).is_some_and(|s| close < s.price);

    Some(SupportResistance {
        levels,
        support,
        resistance,
        support_distance_pct,
        resistance_distance_pct,
        near_support,
        near_resistance,
        volume_surge,
        support_bounce,
        resistance_rejection,
        breakout,
        breakdown,
    })
}
