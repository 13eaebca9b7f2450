//! Order execution port.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::error::SignalError;
use crate::domain::market::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderType {
    Market,
    Limit { price: f64 },
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit { price } => write!(f, "limit@{}", price),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: Side,
    pub size: f64,
    pub order_type: OrderType,
    /// Latest close when the decision was made.
    pub reference_price: Option<f64>,
    /// Why the entry was taken; carried through to logs and fills.
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub order_id: String,
    pub instrument: String,
    pub side: Side,
    pub size: f64,
    pub fill_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A position as the exchange reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangePosition {
    pub side: Side,
    pub size: f64,
}

#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult, SignalError>;

    /// The live position on `instrument`, if any. A zero-size position
    /// counts as none.
    async fn active_position(
        &self,
        instrument: &str,
    ) -> Result<Option<ExchangePosition>, SignalError>;
}
