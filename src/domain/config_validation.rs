//! Configuration validation.
//!
//! Checks every section before the orchestrator or the scorer is built, so a
//! bad value fails at load time with the section and key that caused it.

use std::collections::HashSet;

use crate::domain::error::SignalError;
use crate::domain::market::{Side, Timeframe};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_CANDLE_COUNT: i64 = 100;
pub const DEFAULT_MIN_CANDLES: i64 = 35;

/// Validates `[feed]`, `[orchestrator]`, `[strategy]` and `[scorer]`.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    validate_feed_config(config)?;
    validate_orchestrator_config(config)?;
    validate_strategy_config(config)?;
    validate_scorer_config(config)?;

    if is_automatic(config) {
        let candle_count = config.get_int("feed", "candle_count", DEFAULT_CANDLE_COUNT);
        let min_candles = config.get_int("scorer", "min_candles", DEFAULT_MIN_CANDLES);
        if candle_count < min_candles {
            return Err(SignalError::invalid(
                "feed",
                "candle_count",
                format!("candle_count must be at least [scorer] min_candles ({})", min_candles),
            ));
        }
    }
    Ok(())
}

pub fn validate_feed_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    require(config, "feed", "data_dir")?;
    at_least(config, "feed", "candle_count", DEFAULT_CANDLE_COUNT, 1)?;
    Ok(())
}

pub fn validate_orchestrator_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    let raw = require(config, "orchestrator", "instruments")?;
    parse_instruments(&raw)?;

    if let Some(tf) = config.get_string("orchestrator", "timeframe") {
        tf.parse::<Timeframe>()
            .map_err(|reason| SignalError::invalid("orchestrator", "timeframe", reason))?;
    }

    let order_size = config.get_double("orchestrator", "order_size", 0.0);
    if order_size <= 0.0 {
        return Err(SignalError::invalid(
            "orchestrator",
            "order_size",
            "order_size must be positive",
        ));
    }

    at_least(config, "orchestrator", "tick_interval_secs", 60, 1)?;
    at_least(config, "orchestrator", "min_evaluation_interval_secs", 30, 0)?;
    at_least(config, "orchestrator", "cooldown_ms", 7_000, 0)?;
    at_least(config, "orchestrator", "order_timeout_ms", 10_000, 1)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    match strategy_mode(config).as_str() {
        "automatic" => Ok(()),
        "declarative" => {
            let direction = require(config, "strategy", "direction")?;
            direction
                .parse::<Side>()
                .map_err(|reason| SignalError::invalid("strategy", "direction", reason))?;
            require(config, "strategy", "entry_conditions")?;
            Ok(())
        }
        other => Err(SignalError::invalid(
            "strategy",
            "mode",
            format!("unknown mode '{}' (expected automatic or declarative)", other),
        )),
    }
}

pub fn validate_scorer_config(config: &dyn ConfigPort) -> Result<(), SignalError> {
    for (key, default) in [
        ("macd_fast", 12),
        ("macd_slow", 26),
        ("macd_signal", 9),
        ("rsi_period", 14),
        ("bollinger_period", 20),
        ("volume_period", 20),
        ("ma_fast", 9),
        ("ma_slow", 21),
        ("sr_lookback", 100),
        ("sr_strong_touches", 3),
        ("atr_period", 14),
        ("min_candles", DEFAULT_MIN_CANDLES),
    ] {
        at_least(config, "scorer", key, default, 1)?;
    }

    for key in [
        "macd_weight",
        "rsi_weight",
        "bollinger_weight",
        "volume_weight",
        "ma_weight",
        "sr_breakout_weight",
        "sr_strong_weight",
        "sr_weak_weight",
        "bollinger_buffer_pct",
        "high_volatility_pct",
        "min_separation",
        "high_volatility_separation",
        "min_score",
    ] {
        if config.get_double("scorer", key, 0.0) < 0.0 {
            return Err(SignalError::invalid(
                "scorer",
                key,
                format!("{} must be non-negative", key),
            ));
        }
    }

    for key in ["bollinger_multiplier", "volume_multiplier"] {
        if config.get_double("scorer", key, 2.0) <= 0.0 {
            return Err(SignalError::invalid(
                "scorer",
                key,
                format!("{} must be positive", key),
            ));
        }
    }

    ordered(config, ("macd_fast", 12), ("macd_slow", 26))?;
    ordered(config, ("ma_fast", 9), ("ma_slow", 21))?;

    if let Some(kind) = config.get_string("scorer", "ma_type")
        && !matches!(kind.to_lowercase().as_str(), "ema" | "sma")
    {
        return Err(SignalError::invalid(
            "scorer",
            "ma_type",
            format!("unknown moving average '{}' (expected ema or sma)", kind),
        ));
    }

    rsi_band(config, ("rsi_oversold", 25.0), ("rsi_overbought", 75.0))?;
    rsi_band(config, ("rsi_exhaustion_low", 15.0), ("rsi_exhaustion_high", 85.0))?;
    Ok(())
}

/// Splits a comma list of symbols, upper-casing each. Empty entries are
/// ignored; duplicates and an empty result are rejected.
pub fn parse_instruments(raw: &str) -> Result<Vec<String>, SignalError> {
    let mut seen = HashSet::new();
    let mut instruments = Vec::new();

    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if symbol.is_empty() {
            continue;
        }
        if !seen.insert(symbol.clone()) {
            return Err(SignalError::invalid(
                "orchestrator",
                "instruments",
                format!("duplicate instrument '{}'", symbol),
            ));
        }
        instruments.push(symbol);
    }

    if instruments.is_empty() {
        return Err(SignalError::invalid(
            "orchestrator",
            "instruments",
            "at least one instrument is required",
        ));
    }
    Ok(instruments)
}

pub fn strategy_mode(config: &dyn ConfigPort) -> String {
    config
        .get_string("strategy", "mode")
        .unwrap_or_else(|| "automatic".to_string())
        .to_lowercase()
}

fn is_automatic(config: &dyn ConfigPort) -> bool {
    strategy_mode(config) == "automatic"
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SignalError> {
    config
        .get_string(section, key)
        .ok_or_else(|| SignalError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn at_least(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: i64,
) -> Result<(), SignalError> {
    if let Some(raw) = config.get_string(section, key)
        && raw.parse::<i64>().is_err()
    {
        return Err(SignalError::invalid(section, key, format!("{} must be an integer", key)));
    }
    if config.get_int(section, key, default) < min {
        return Err(SignalError::invalid(
            section,
            key,
            format!("{} must be at least {}", key, min),
        ));
    }
    Ok(())
}

fn ordered(
    config: &dyn ConfigPort,
    (fast_key, fast_default): (&str, i64),
    (slow_key, slow_default): (&str, i64),
) -> Result<(), SignalError> {
    let fast = config.get_int("scorer", fast_key, fast_default);
    let slow = config.get_int("scorer", slow_key, slow_default);
    if fast >= slow {
        return Err(SignalError::invalid(
            "scorer",
            fast_key,
            format!("{} must be less than {}", fast_key, slow_key),
        ));
    }
    Ok(())
}

fn rsi_band(
    config: &dyn ConfigPort,
    (low_key, low_default): (&str, f64),
    (high_key, high_default): (&str, f64),
) -> Result<(), SignalError> {
    let low = config.get_double("scorer", low_key, low_default);
    let high = config.get_double("scorer", high_key, high_default);
    if !(0.0..=100.0).contains(&low) || !(0.0..=100.0).contains(&high) {
        return Err(SignalError::invalid(
            "scorer",
            low_key,
            format!("{} and {} must be between 0 and 100", low_key, high_key),
        ));
    }
    if low >= high {
        return Err(SignalError::invalid(
            "scorer",
            low_key,
            format!("{} must be below {}", low_key, high_key),
        ));
    }
    Ok(())
}
