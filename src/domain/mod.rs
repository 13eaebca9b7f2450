//! Signal scoring, condition evaluation and entry coordination.

pub mod candle;
pub mod clock;
pub mod condition;
pub mod condition_eval;
pub mod condition_parser;
pub mod config_validation;
pub mod error;
pub mod guard;
pub mod indicator;
pub mod market;
pub mod orchestrator;
pub mod rate_limiter;
pub mod scorer;
pub mod strategy;
