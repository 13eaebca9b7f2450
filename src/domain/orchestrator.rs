//! Entry orchestration.
//!
//! One cycle for one managed instrument:
//!
//! 1. stop if the global pause flag is set or the rate limiter vetoes
//! 2. fetch the candle window (a failed fetch is insufficient data)
//! 3. assess the strategy; no signal stops here without touching the guard
//! 4. `can_enter` + `begin` through an `EntryPermit`
//! 5. double-check the live exchange position
//! 6. place the order under a timeout
//! 7. the permit drops and releases the guard with the cooldown, whatever
//!    happened in 5 and 6
//!
//! Cycles for different instruments run concurrently and share one guard.
//! A failure in one cycle is reported in its outcome and never reaches
//! another instrument's cycle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Duration;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, timeout};
use tracing::{debug, error, info, warn};

use crate::domain::clock::Clock;
use crate::domain::error::SignalError;
use crate::domain::guard::{GuardRejection, PositionGuard};
use crate::domain::market::{Side, Timeframe};
use crate::domain::rate_limiter::EvaluationRateLimiter;
use crate::domain::scorer::{NoSignalReason, Verdict};
use crate::domain::strategy::Strategy;
use crate::ports::candle_port::CandleFeed;
use crate::ports::execution_port::{OrderExecutor, OrderRequest, OrderResult, OrderType};

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub candle_count: usize,
    /// Applied after every entry attempt, successful or not.
    pub cooldown: Duration,
    pub order_timeout: std::time::Duration,
    pub tick_interval: std::time::Duration,
    pub min_evaluation_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            candle_count: 100,
            cooldown: Duration::milliseconds(7_000),
            order_timeout: std::time::Duration::from_millis(10_000),
            tick_interval: std::time::Duration::from_secs(60),
            min_evaluation_interval: Duration::seconds(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagedInstrument {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub order_size: f64,
    pub strategy: Arc<Strategy>,
}

/// Global kill switch, polled before every cycle.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    pub fn new(paused: bool) -> Self {
        Self(Arc::new(AtomicBool::new(paused)))
    }

    pub fn pause(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Paused,
    RateLimited,
    InsufficientData,
    NoSignal(NoSignalReason),
    Blocked(GuardRejection),
    Entered(OrderResult),
    ExecutionFailed(String),
}

impl CycleOutcome {
    pub fn is_entry(&self) -> bool {
        matches!(self, CycleOutcome::Entered(_))
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Paused => write!(f, "paused"),
            CycleOutcome::RateLimited => write!(f, "rate limited"),
            CycleOutcome::InsufficientData => write!(f, "insufficient data"),
            CycleOutcome::NoSignal(reason) => write!(f, "no signal: {}", reason),
            CycleOutcome::Blocked(rejection) => write!(f, "blocked: {}", rejection),
            CycleOutcome::Entered(order) => write!(
                f,
                "entered {} {} x{} (order {})",
                order.side, order.instrument, order.size, order.order_id
            ),
            CycleOutcome::ExecutionFailed(reason) => write!(f, "execution failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub instrument: String,
    pub outcome: CycleOutcome,
}

pub struct EntryOrchestrator {
    config: OrchestratorConfig,
    instruments: Vec<ManagedInstrument>,
    feed: Arc<dyn CandleFeed>,
    executor: Arc<dyn OrderExecutor>,
    guard: Arc<PositionGuard>,
    limiter: EvaluationRateLimiter,
    pause: PauseFlag,
    clock: Arc<dyn Clock>,
}

impl EntryOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        feed: Arc<dyn CandleFeed>,
        executor: Arc<dyn OrderExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = Arc::new(PositionGuard::new(Arc::clone(&clock)));
        let limiter = EvaluationRateLimiter::new(config.min_evaluation_interval);
        Self {
            config,
            instruments: Vec::new(),
            feed,
            executor,
            guard,
            limiter,
            pause: PauseFlag::default(),
            clock,
        }
    }

    /// Shares an existing guard, e.g. with a scanner running its own cycles.
    pub fn with_guard(mut self, guard: Arc<PositionGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_pause_flag(mut self, pause: PauseFlag) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_instruments(mut self, instruments: Vec<ManagedInstrument>) -> Self {
        self.instruments = instruments;
        self
    }

    pub fn instruments(&self) -> &[ManagedInstrument] {
        &self.instruments
    }

    pub fn guard(&self) -> &Arc<PositionGuard> {
        &self.guard
    }

    pub fn pause_flag(&self) -> &PauseFlag {
        &self.pause
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// One scheduled cycle, subject to the rate limiter.
    pub async fn evaluate_instrument(&self, instrument: &ManagedInstrument) -> CycleOutcome {
        self.cycle(instrument, true).await
    }

    /// An on-demand cycle for a managed instrument. Skips the rate limiter
    /// but honours the pause flag and the guard. `None` if the symbol is not
    /// managed here.
    pub async fn trigger(&self, symbol: &str) -> Option<CycleOutcome> {
        let instrument = self.instruments.iter().find(|i| i.symbol == symbol)?;
        Some(self.cycle(instrument, false).await)
    }

    /// Evaluates every managed instrument concurrently.
    pub async fn run_tick(&self) -> Vec<CycleReport> {
        join_all(self.instruments.iter().map(|instrument| async move {
            CycleReport {
                instrument: instrument.symbol.clone(),
                outcome: self.evaluate_instrument(instrument).await,
            }
        }))
        .await
    }

    /// Repeats `run_tick` every `tick_interval` until `shutdown` turns true
    /// (or its sender goes away) or `max_ticks` ticks have run. Returns the
    /// number of ticks run.
    pub async fn run<F>(
        &self,
        mut shutdown: watch::Receiver<bool>,
        max_ticks: Option<usize>,
        mut on_tick: F,
    ) -> usize
    where
        F: FnMut(usize, &[CycleReport]),
    {
        // a zero period panics in tokio
        let period = self.config.tick_interval.max(std::time::Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0;

        info!(
            instruments = self.instruments.len(),
            tick_secs = self.config.tick_interval.as_secs_f64(),
            "orchestrator started"
        );

        loop {
            if *shutdown.borrow() || max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    let reports = self.run_tick().await;
                    ticks += 1;
                    let entries = reports.iter().filter(|r| r.outcome.is_entry()).count();
                    debug!(tick = ticks, entries, "tick complete");
                    on_tick(ticks, &reports);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(ticks, "orchestrator stopped");
        ticks
    }

    async fn cycle(&self, instrument: &ManagedInstrument, rate_limited: bool) -> CycleOutcome {
        let symbol = instrument.symbol.as_str();

        if self.pause.is_paused() {
            debug!(instrument = symbol, "paused, skipping cycle");
            return CycleOutcome::Paused;
        }
        if rate_limited && !self.limiter.try_begin(symbol, self.clock.now()) {
            debug!(instrument = symbol, "evaluated too recently, skipping");
            return CycleOutcome::RateLimited;
        }

        let candles = match self
            .feed
            .get_candles(symbol, instrument.timeframe, self.config.candle_count)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!(instrument = symbol, error = %e, "candle fetch failed");
                return CycleOutcome::InsufficientData;
            }
        };

        let (sheet, verdict) = instrument.strategy.assess(&candles);
        let decision = match verdict {
            Verdict::Signal(decision) => decision,
            Verdict::NoSignal(NoSignalReason::InsufficientData) => {
                debug!(instrument = symbol, candles = candles.len(), "not enough candles");
                return CycleOutcome::InsufficientData;
            }
            Verdict::NoSignal(reason) => {
                debug!(
                    instrument = symbol,
                    bullish = sheet.as_ref().map(|s| s.bullish),
                    bearish = sheet.as_ref().map(|s| s.bearish),
                    reason = %reason,
                    "no signal"
                );
                return CycleOutcome::NoSignal(reason);
            }
        };

        let side = decision.direction;
        info!(
            instrument = symbol,
            %side,
            confidence = decision.confidence,
            bullish = decision.bullish_score,
            bearish = decision.bearish_score,
            strategy = %instrument.strategy.name,
            "signal"
        );

        let permit = match self.guard.try_enter(symbol, side, self.config.cooldown) {
            Ok(permit) => permit,
            Err(rejection) => {
                warn!(instrument = symbol, %side, reason = %rejection, "entry refused by guard");
                return CycleOutcome::Blocked(rejection);
            }
        };

        let outcome = self
            .enter(instrument, side, decision.confidence, candles.last().map(|c| c.close))
            .await;
        drop(permit);
        outcome
    }

    async fn enter(
        &self,
        instrument: &ManagedInstrument,
        side: Side,
        confidence: f64,
        reference_price: Option<f64>,
    ) -> CycleOutcome {
        let symbol = instrument.symbol.as_str();

        match self.executor.active_position(symbol).await {
            Ok(Some(position)) if position.size > 0.0 => {
                let rejection = if position.side == side {
                    GuardRejection::SameSideAlreadyOpen
                } else {
                    GuardRejection::OppositeSideOpen
                };
                info!(
                    instrument = symbol,
                    %side,
                    open_side = %position.side,
                    open_size = position.size,
                    reason = %rejection,
                    "position already open on exchange"
                );
                return CycleOutcome::Blocked(rejection);
            }
            Ok(_) => {}
            Err(e) => {
                error!(instrument = symbol, %side, error = %e, "entry_failed");
                return CycleOutcome::ExecutionFailed(e.to_string());
            }
        }

        let request = OrderRequest {
            instrument: symbol.to_string(),
            side,
            size: instrument.order_size,
            order_type: OrderType::Market,
            reference_price,
            reason: format!("{} ({:.0}% confidence)", instrument.strategy.name, confidence),
        };

        let placed = match timeout(self.config.order_timeout, self.executor.place_order(&request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SignalError::ExecutionTimeout {
                instrument: symbol.to_string(),
                timeout_ms: self.config.order_timeout.as_millis() as u64,
            }),
        };

        match placed {
            Ok(order) => {
                info!(
                    instrument = symbol,
                    %side,
                    order_id = %order.order_id,
                    size = order.size,
                    fill_price = order.fill_price,
                    "entry_ok"
                );
                CycleOutcome::Entered(order)
            }
            Err(e) => {
                error!(instrument = symbol, %side, error = %e, "entry_failed");
                CycleOutcome::ExecutionFailed(e.to_string())
            }
        }
    }
}
