#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
pub use signalguard::domain::candle::Candle;
use signalguard::domain::clock::ManualClock;
use signalguard::domain::error::SignalError;
use signalguard::domain::market::{Side, Timeframe};
use signalguard::domain::orchestrator::ManagedInstrument;
use signalguard::domain::strategy::Strategy;
use signalguard::ports::candle_port::CandleFeed;
use signalguard::ports::execution_port::{
    ExchangePosition, OrderExecutor, OrderRequest, OrderResult,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

/// Hourly candles with a one-point range around each close.
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start_time() + Duration::hours(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

pub fn make_candle(
    hour: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
) -> Candle {
    Candle {
        timestamp: start_time() + Duration::hours(hour),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// A strategy whose single condition holds on any non-empty series.
pub fn always_long() -> Arc<Strategy> {
    Arc::new(Strategy::declarative("always long", Side::Long, "SMA(1) ABOVE 0").unwrap())
}

pub fn always_short() -> Arc<Strategy> {
    Arc::new(Strategy::declarative("always short", Side::Short, "SMA(1) ABOVE 0").unwrap())
}

pub fn never() -> Arc<Strategy> {
    Arc::new(Strategy::declarative("never", Side::Long, "SMA(1) BELOW 0").unwrap())
}

pub fn managed(symbol: &str, strategy: Arc<Strategy>) -> ManagedInstrument {
    ManagedInstrument {
        symbol: symbol.to_string(),
        timeframe: Timeframe::H1,
        order_size: 1.0,
        strategy,
    }
}

pub struct MockCandleFeed {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl MockCandleFeed {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_candles(mut self, instrument: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(instrument.to_string(), candles);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleFeed for MockCandleFeed {
    async fn get_candles(
        &self,
        instrument: &str,
        _timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, SignalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(instrument) {
            return Err(SignalError::CandleFeed {
                instrument: instrument.to_string(),
                reason: reason.clone(),
            });
        }
        let candles = self.data.get(instrument).cloned().unwrap_or_default();
        let skip = candles.len().saturating_sub(count);
        Ok(candles.into_iter().skip(skip).collect())
    }
}

pub struct MockExecutor {
    pub positions: HashMap<String, ExchangePosition>,
    pub failure: Option<String>,
    pub position_failure: Option<String>,
    pub delay: Option<StdDuration>,
    pub placed: Mutex<Vec<OrderRequest>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            failure: None,
            position_failure: None,
            delay: None,
            placed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_position(mut self, instrument: &str, side: Side, size: f64) -> Self {
        self.positions
            .insert(instrument.to_string(), ExchangePosition { side, size });
        self
    }

    pub fn with_failure(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    pub fn with_position_failure(mut self, reason: &str) -> Self {
        self.position_failure = Some(reason.to_string());
        self
    }

    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn placed(&self) -> Vec<OrderRequest> {
        self.placed.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderExecutor for MockExecutor {
    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult, SignalError> {
        let order_number = {
            let mut placed = self.placed.lock().unwrap();
            placed.push(request.clone());
            placed.len()
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(SignalError::Execution {
                instrument: request.instrument.clone(),
                reason: reason.clone(),
            });
        }
        Ok(OrderResult {
            order_id: format!("mock-{}", order_number),
            instrument: request.instrument.clone(),
            side: request.side,
            size: request.size,
            fill_price: request.reference_price,
            timestamp: start_time(),
        })
    }

    async fn active_position(
        &self,
        instrument: &str,
    ) -> Result<Option<ExchangePosition>, SignalError> {
        if let Some(reason) = &self.position_failure {
            return Err(SignalError::Execution {
                instrument: instrument.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.positions.get(instrument).copied())
    }
}
