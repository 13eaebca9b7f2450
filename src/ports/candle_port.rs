//! Candle feed port.

use async_trait::async_trait;

use crate::domain::candle::Candle;
use crate::domain::error::SignalError;
use crate::domain::market::Timeframe;

#[async_trait]
pub trait CandleFeed: Send + Sync {
    /// Up to `count` most recent candles, ascending by timestamp. A short
    /// series is a valid answer.
    async fn get_candles(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, SignalError>;
}
