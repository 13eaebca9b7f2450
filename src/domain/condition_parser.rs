//! Condition DSL parser.
//!
//! Recursive descent over `<INDICATOR> <OPERATOR> [threshold [upper]]`:
//!
//! ```text
//! RSI(14) BELOW 30
//! MACD(12,26,9) BULLISH_CROSSOVER
//! BOLLINGER(20,2) BETWEEN 0 20
//! EMA CROSSING_UP 100          # parameters default when omitted
//! ```
//!
//! Keywords are case-insensitive. Errors carry the character offset of the
//! offending token; an unrecognised indicator name is flagged on the error so
//! callers can keep the entry as an unresolved, fail-closed condition.

use crate::domain::condition::{Comparison, Condition};
use crate::domain::error::ParseError;
use crate::domain::indicator::crossover::MaKind;
use crate::domain::indicator::support_resistance::SupportResistanceParams;
use crate::domain::indicator::{
    BollingerParams, IndicatorKind, MaCrossoverParams, MacdParams, StochasticParams, atr, cci,
    rsi, volume, williams,
};

/// Separator between conditions in a strategy's `entry_conditions` list.
pub const CONDITION_SEPARATOR: char = ';';

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::new(
                format!("expected '{}', found '{}'", expected, ch),
                self.pos,
            )),
            None => Err(ParseError::new(
                format!("expected '{}', found end of input", expected),
                self.pos,
            )),
        }
    }

    fn peek_word(&self) -> &'a str {
        let rest = self.remaining();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn describe_next(&self) -> String {
        let word = self.peek_word();
        if !word.is_empty() {
            word.to_string()
        } else {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if matches!(self.peek(), Some('-') | Some('+')) {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError::new(
                format!("expected number, found '{}'", self.describe_next()),
                start,
            ));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| ParseError::new(format!("invalid number: {}", num_str), start))
    }

    fn parse_period(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let num_str = &self.input[start..self.pos];
        if num_str.is_empty() {
            return Err(ParseError::new(
                format!("expected integer, found '{}'", self.describe_next()),
                start,
            ));
        }
        match num_str.parse::<usize>() {
            Ok(0) => Err(ParseError::new("period must be positive", start)),
            Ok(n) => Ok(n),
            Err(_) => Err(ParseError::new(format!("invalid integer: {}", num_str), start)),
        }
    }

    /// Consumes `(` directly after an indicator name. Without it every
    /// parameter takes its default.
    fn open_args(&mut self) -> bool {
        if self.peek() == Some('(') {
            self.advance();
            true
        } else {
            false
        }
    }

    fn single_period(&mut self, default: usize) -> Result<usize, ParseError> {
        if !self.open_args() {
            return Ok(default);
        }
        let period = self.parse_period()?;
        self.expect_char(')')?;
        Ok(period)
    }

    fn parse_macd_params(&mut self) -> Result<MacdParams, ParseError> {
        if !self.open_args() {
            return Ok(MacdParams::default());
        }
        let start = self.pos;
        let fast = self.parse_period()?;
        self.expect_char(',')?;
        let slow = self.parse_period()?;
        self.expect_char(',')?;
        let signal = self.parse_period()?;
        self.expect_char(')')?;
        if fast >= slow {
            return Err(ParseError::new(
                "MACD fast period must be shorter than slow period",
                start,
            ));
        }
        Ok(MacdParams { fast, slow, signal })
    }

    fn parse_bollinger_params(&mut self) -> Result<BollingerParams, ParseError> {
        if !self.open_args() {
            return Ok(BollingerParams::default());
        }
        let period = self.parse_period()?;
        self.skip_whitespace();
        let multiplier = if self.peek() == Some(',') {
            self.advance();
            let start = self.pos;
            let m = self.parse_number()?;
            if m <= 0.0 {
                return Err(ParseError::new("band multiplier must be positive", start));
            }
            m
        } else {
            BollingerParams::default().multiplier
        };
        self.expect_char(')')?;
        Ok(BollingerParams { period, multiplier })
    }

    fn parse_stochastic_params(&mut self) -> Result<StochasticParams, ParseError> {
        if !self.open_args() {
            return Ok(StochasticParams::default());
        }
        let k_period = self.parse_period()?;
        self.skip_whitespace();
        let d_period = if self.peek() == Some(',') {
            self.advance();
            self.parse_period()?
        } else {
            StochasticParams::default().d_period
        };
        self.expect_char(')')?;
        Ok(StochasticParams { k_period, d_period })
    }

    fn parse_ma_cross_params(&mut self) -> Result<MaCrossoverParams, ParseError> {
        if !self.open_args() {
            return Ok(MaCrossoverParams::default());
        }
        let start = self.pos;
        let fast = self.parse_period()?;
        self.expect_char(',')?;
        let slow = self.parse_period()?;
        self.skip_whitespace();
        let kind = if self.peek() == Some(',') {
            self.advance();
            self.skip_whitespace();
            let word_pos = self.pos;
            let word = self.peek_word();
            let kind = match word.to_ascii_uppercase().as_str() {
                "EMA" => MaKind::Ema,
                "SMA" => MaKind::Sma,
                _ => {
                    return Err(ParseError::new(
                        format!("expected SMA or EMA, found '{}'", self.describe_next()),
                        word_pos,
                    ));
                }
            };
            self.pos += word.len();
            kind
        } else {
            MaKind::Ema
        };
        self.expect_char(')')?;
        if fast >= slow {
            return Err(ParseError::new(
                "fast period must be shorter than slow period",
                start,
            ));
        }
        Ok(MaCrossoverParams { fast, slow, kind })
    }

    fn parse_indicator(&mut self) -> Result<IndicatorKind, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.peek_word();
        if word.is_empty() {
            return Err(ParseError::new(
                format!("expected indicator, found '{}'", self.describe_next()),
                start,
            ));
        }
        self.pos += word.len();

        let kind = match word.to_ascii_uppercase().as_str() {
            "SMA" => IndicatorKind::Sma {
                period: self.single_period(20)?,
            },
            "EMA" => IndicatorKind::Ema {
                period: self.single_period(20)?,
            },
            "RSI" => IndicatorKind::Rsi {
                period: self.single_period(rsi::DEFAULT_PERIOD)?,
            },
            "MACD" => IndicatorKind::Macd(self.parse_macd_params()?),
            "BOLLINGER" | "BB" => IndicatorKind::Bollinger(self.parse_bollinger_params()?),
            "ATR" => IndicatorKind::Atr {
                period: self.single_period(atr::DEFAULT_PERIOD)?,
            },
            "CCI" => IndicatorKind::Cci {
                period: self.single_period(cci::DEFAULT_PERIOD)?,
            },
            "STOCHASTIC" | "STOCH" => IndicatorKind::Stochastic(self.parse_stochastic_params()?),
            "WILLIAMS" | "WILLIAMS_R" | "WILLR" => IndicatorKind::WilliamsR {
                period: self.single_period(williams::DEFAULT_PERIOD)?,
            },
            "VOLUME" => IndicatorKind::Volume {
                period: self.single_period(volume::DEFAULT_PERIOD)?,
            },
            "MA_CROSS" | "MA_CROSSOVER" => {
                IndicatorKind::MaCrossover(self.parse_ma_cross_params()?)
            }
            "SR" | "SUPPORT_RESISTANCE" => {
                let defaults = SupportResistanceParams::default();
                let lookback = self.single_period(defaults.lookback)?;
                IndicatorKind::SupportResistance(SupportResistanceParams {
                    lookback,
                    ..defaults
                })
            }
            _ => return Err(ParseError::unknown_indicator(word, start)),
        };
        Ok(kind)
    }

    fn parse_comparison(&mut self) -> Result<Comparison, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.peek_word();
        let keyword = word.to_ascii_uppercase();
        let known = matches!(
            keyword.as_str(),
            "ABOVE"
                | "BELOW"
                | "BETWEEN"
                | "CROSSING_UP"
                | "CROSSING_DOWN"
                | "BULLISH_CROSSOVER"
                | "BEARISH_CROSSOVER"
        );
        if !known {
            return Err(ParseError::new(
                format!(
                    "expected operator (ABOVE, BELOW, BETWEEN, CROSSING_UP, CROSSING_DOWN, \
                     BULLISH_CROSSOVER, BEARISH_CROSSOVER), found '{}'",
                    self.describe_next()
                ),
                start,
            ));
        }
        self.pos += word.len();

        let comparison = match keyword.as_str() {
            "ABOVE" => Comparison::Above(self.parse_number()?),
            "BELOW" => Comparison::Below(self.parse_number()?),
            "CROSSING_UP" => Comparison::CrossingUp(self.parse_number()?),
            "CROSSING_DOWN" => Comparison::CrossingDown(self.parse_number()?),
            "BULLISH_CROSSOVER" => Comparison::BullishCrossover,
            "BEARISH_CROSSOVER" => Comparison::BearishCrossover,
            _ => {
                let lower = self.parse_number()?;
                let upper_pos = self.pos;
                let upper = self.parse_number()?;
                if lower > upper {
                    return Err(ParseError::new(
                        format!("BETWEEN lower bound {} exceeds upper bound {}", lower, upper),
                        upper_pos,
                    ));
                }
                Comparison::Between { lower, upper }
            }
        };
        Ok(comparison)
    }

    fn parse(&mut self) -> Result<Condition, ParseError> {
        let indicator = self.parse_indicator()?;
        let comparison = self.parse_comparison()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError::new(
                format!("unexpected input after condition: '{}'", self.remaining()),
                self.pos,
            ));
        }
        Ok(Condition::new(indicator, comparison))
    }
}

pub fn parse(input: &str) -> Result<Condition, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

/// Splits a `;`-separated list into trimmed, non-empty condition sources.
pub fn split_conditions(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(CONDITION_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
