//! In-memory order executor for dry runs.
//!
//! Fills every market order at its reference price, adjusted by a fixed
//! slippage percentage against the trader, and books the resulting
//! position so the orchestrator's exchange double-check sees it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use crate::domain::clock::Clock;
use crate::domain::error::SignalError;
use crate::domain::market::Side;
use crate::ports::execution_port::{
    ExchangePosition, OrderExecutor, OrderRequest, OrderResult, OrderType,
};

/// Long entries buy above the market, short entries sell below it.
pub fn apply_entry_slippage(price: f64, side: Side, slippage_pct: f64) -> f64 {
    match side {
        Side::Long => price * (1.0 + slippage_pct / 100.0),
        Side::Short => price * (1.0 - slippage_pct / 100.0),
    }
}

pub struct PaperExecutor {
    clock: Arc<dyn Clock>,
    slippage_pct: f64,
    next_id: AtomicU64,
    fills: Mutex<Vec<OrderResult>>,
    positions: Mutex<HashMap<String, ExchangePosition>>,
}

impl PaperExecutor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slippage_pct: 0.0,
            next_id: AtomicU64::new(1),
            fills: Mutex::new(Vec::new()),
            positions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_slippage_pct(mut self, slippage_pct: f64) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Every fill so far, oldest first.
    pub fn fills(&self) -> Vec<OrderResult> {
        self.fills
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Flattens the position on `instrument`, returning what was open.
    pub fn close_position(&self, instrument: &str) -> Option<ExchangePosition> {
        self.positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(instrument)
    }

    fn book(&self, instrument: &str, side: Side, size: f64) {
        let mut positions = self.positions.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = positions
            .entry(instrument.to_string())
            .or_insert(ExchangePosition { side, size: 0.0 });

        if entry.side == side {
            entry.size += size;
        } else if size > entry.size {
            *entry = ExchangePosition {
                side,
                size: size - entry.size,
            };
        } else {
            entry.size -= size;
        }

        if entry.size <= 0.0 {
            positions.remove(instrument);
        }
    }
}

#[async_trait]
impl OrderExecutor for PaperExecutor {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult, SignalError> {
        let reject = |reason: &str| SignalError::Execution {
            instrument: request.instrument.clone(),
            reason: reason.to_string(),
        };

        if request.size.is_nan() || request.size <= 0.0 {
            return Err(reject("order size must be positive"));
        }
        let market = match request.order_type {
            OrderType::Market => request
                .reference_price
                .ok_or_else(|| reject("market order without a reference price"))?,
            OrderType::Limit { price } => price,
        };
        let fill_price = apply_entry_slippage(market, request.side, self.slippage_pct);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let result = OrderResult {
            order_id: format!("paper-{}", id),
            instrument: request.instrument.clone(),
            side: request.side,
            size: request.size,
            fill_price: Some(fill_price),
            timestamp: self.clock.now(),
        };

        self.book(&request.instrument, request.side, request.size);
        self.fills
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result.clone());

        info!(
            instrument = %request.instrument,
            side = %request.side,
            size = request.size,
            fill_price,
            order_type = %request.order_type,
            reason = %request.reason,
            "paper fill"
        );
        Ok(result)
    }

    async fn active_position(
        &self,
        instrument: &str,
    ) -> Result<Option<ExchangePosition>, SignalError> {
        Ok(self
            .positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(instrument)
            .copied()
            .filter(|p| p.size > 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn executor() -> PaperExecutor {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        PaperExecutor::new(clock)
    }

    fn market(instrument: &str, side: Side, size: f64, price: Option<f64>) -> OrderRequest {
        OrderRequest {
            instrument: instrument.to_string(),
            side,
            size,
            order_type: OrderType::Market,
            reference_price: price,
            reason: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn market_order_fills_at_reference_price() {
        let exec = executor();
        let fill = exec
            .place_order(&market("BTCUSD", Side::Long, 0.5, Some(42_000.0)))
            .await
            .unwrap();
        assert_eq!(fill.order_id, "paper-1");
        assert_eq!(fill.fill_price, Some(42_000.0));

        let position = exec.active_position("BTCUSD").await.unwrap().unwrap();
        assert_eq!(position.side, Side::Long);
        assert_relative_eq!(position.size, 0.5);
        assert_eq!(exec.active_position("ETHUSD").await.unwrap(), None);
    }

    #[tokio::test]
    async fn slippage_moves_fill_against_trader() {
        let exec = executor().with_slippage_pct(0.1);
        let long = exec
            .place_order(&market("BTCUSD", Side::Long, 1.0, Some(100.0)))
            .await
            .unwrap();
        let short = exec
            .place_order(&market("ETHUSD", Side::Short, 1.0, Some(100.0)))
            .await
            .unwrap();
        assert_relative_eq!(long.fill_price.unwrap(), 100.1);
        assert_relative_eq!(short.fill_price.unwrap(), 99.9);
    }

    #[tokio::test]
    async fn opposite_fill_nets_the_position() {
        let exec = executor();
        exec.place_order(&market("BTCUSD", Side::Long, 1.0, Some(10.0)))
            .await
            .unwrap();
        exec.place_order(&market("BTCUSD", Side::Short, 1.0, Some(10.0)))
            .await
            .unwrap();
        assert_eq!(exec.active_position("BTCUSD").await.unwrap(), None);

        exec.place_order(&market("BTCUSD", Side::Short, 2.0, Some(10.0)))
            .await
            .unwrap();
        let position = exec.active_position("BTCUSD").await.unwrap().unwrap();
        assert_eq!(position.side, Side::Short);
        assert_eq!(exec.fills().len(), 3);
    }

    #[tokio::test]
    async fn rejects_missing_price_and_bad_size() {
        let exec = executor();
        let err = exec
            .place_order(&market("BTCUSD", Side::Long, 1.0, None))
            .await
            .unwrap_err();
        assert!(matches!(err, SignalError::Execution { .. }));

        let err = exec
            .place_order(&market("BTCUSD", Side::Long, 0.0, Some(1.0)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("size must be positive"));
        assert!(exec.fills().is_empty());
    }

    #[tokio::test]
    async fn close_position_flattens() {
        let exec = executor();
        exec.place_order(&market("BTCUSD", Side::Long, 1.0, Some(10.0)))
            .await
            .unwrap();
        let closed = exec.close_position("BTCUSD").unwrap();
        assert_eq!(closed.side, Side::Long);
        assert_eq!(exec.active_position("BTCUSD").await.unwrap(), None);
        assert_eq!(exec.close_position("BTCUSD"), None);
    }
}
