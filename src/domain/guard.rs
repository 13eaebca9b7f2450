//! Single-position entry guard.
//!
//! Per instrument the guard moves Idle -> Locked(side) -> Active -> Cooldown
//! -> Idle. `begin` is one test-and-set under a single mutex over the lock
//! set and the active set together, so concurrent callers racing on one
//! instrument cannot both succeed. No method ever waits: a refused entry is
//! the final answer for that cycle.
//!
//! State is process-local and is not persisted. After a restart the
//! orchestrator reconciles against live exchange positions before ordering.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use crate::domain::clock::Clock;
use crate::domain::market::Side;

pub const DEFAULT_COOLDOWN_MS: i64 = 10_000;

/// Why an entry attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardRejection {
    /// Cooling down, or a position is already active.
    BlockedByGuard,
    /// Another cycle won the race for the lock.
    AlreadyLocked,
    SameSideAlreadyOpen,
    OppositeSideOpen,
}

impl GuardRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            GuardRejection::BlockedByGuard => "blocked_by_guard",
            GuardRejection::AlreadyLocked => "already_locked",
            GuardRejection::SameSideAlreadyOpen => "same_side_already_open",
            GuardRejection::OppositeSideOpen => "opposite_side_open",
        }
    }
}

impl fmt::Display for GuardRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct GuardState {
    active: HashSet<String>,
    locks: HashSet<(String, Side)>,
    cooldown_until: HashMap<String, DateTime<Utc>>,
}

/// Point-in-time copy of the guard state, ordered for stable output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuardSnapshot {
    pub active: BTreeSet<String>,
    pub locks: BTreeSet<(String, Side)>,
    pub cooldown_until: BTreeMap<String, DateTime<Utc>>,
}

impl GuardSnapshot {
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.locks.is_empty()
    }
}

pub struct PositionGuard {
    state: Mutex<GuardState>,
    clock: Arc<dyn Clock>,
    default_cooldown: Duration,
}

impl fmt::Debug for PositionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionGuard")
            .field("state", &self.snapshot())
            .field("default_cooldown", &self.default_cooldown)
            .finish()
    }
}

impl PositionGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_default_cooldown(clock, Duration::milliseconds(DEFAULT_COOLDOWN_MS))
    }

    pub fn with_default_cooldown(clock: Arc<dyn Clock>, default_cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(GuardState::default()),
            clock,
            default_cooldown,
        }
    }

    pub fn default_cooldown(&self) -> Duration {
        self.default_cooldown
    }

    // Every critical section is a single check-and-mutate, so a poisoned
    // lock still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_cooling_down(&self, instrument: &str, now: DateTime<Utc>) -> bool {
        self.lock()
            .cooldown_until
            .get(instrument)
            .is_some_and(|until| now < *until)
    }

    /// Pure read: false while cooling down or while a position is active.
    pub fn can_enter(&self, instrument: &str, _side: Side, now: DateTime<Utc>) -> bool {
        let state = self.lock();
        let cooling = state
            .cooldown_until
            .get(instrument)
            .is_some_and(|until| now < *until);
        !cooling && !state.active.contains(instrument)
    }

    /// Takes the `(instrument, side)` lock and marks the instrument active,
    /// or returns false without touching anything.
    pub fn begin(&self, instrument: &str, side: Side) -> bool {
        let mut state = self.lock();
        let key = (instrument.to_string(), side);
        if state.locks.contains(&key) || state.active.contains(instrument) {
            return false;
        }
        state.locks.insert(key);
        state.active.insert(instrument.to_string());
        true
    }

    /// Clears the lock and the active marker. A positive `cooldown` blocks
    /// re-entry until `now + cooldown`.
    pub fn end(&self, instrument: &str, side: Side, cooldown: Duration) {
        let now = self.clock.now();
        let mut state = self.lock();
        state.locks.remove(&(instrument.to_string(), side));
        state.active.remove(instrument);
        if cooldown > Duration::zero() {
            state
                .cooldown_until
                .insert(instrument.to_string(), now + cooldown);
        }
        trace!(instrument, %side, cooldown_ms = cooldown.num_milliseconds(), "guard released");
    }

    pub fn end_with_default(&self, instrument: &str, side: Side) {
        self.end(instrument, side, self.default_cooldown);
    }

    /// `can_enter` then `begin`, returning a permit that ends the entry with
    /// `cooldown` when dropped.
    pub fn try_enter(
        self: &Arc<Self>,
        instrument: &str,
        side: Side,
        cooldown: Duration,
    ) -> Result<EntryPermit, GuardRejection> {
        if !self.can_enter(instrument, side, self.clock.now()) {
            debug!(instrument, %side, "entry blocked by guard");
            return Err(GuardRejection::BlockedByGuard);
        }
        if !self.begin(instrument, side) {
            debug!(instrument, %side, "entry lock already held");
            return Err(GuardRejection::AlreadyLocked);
        }
        Ok(EntryPermit {
            guard: Arc::clone(self),
            instrument: instrument.to_string(),
            side,
            cooldown,
        })
    }

    pub fn snapshot(&self) -> GuardSnapshot {
        let state = self.lock();
        GuardSnapshot {
            active: state.active.iter().cloned().collect(),
            locks: state.locks.iter().cloned().collect(),
            cooldown_until: state
                .cooldown_until
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        }
    }
}

/// A held entry lock. Dropping it calls `end` exactly once, whichever way
/// the holder exits.
#[derive(Debug)]
pub struct EntryPermit {
    guard: Arc<PositionGuard>,
    instrument: String,
    side: Side,
    cooldown: Duration,
}

impl EntryPermit {
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }
}

impl Drop for EntryPermit {
    fn drop(&mut self) {
        self.guard.end(&self.instrument, self.side, self.cooldown);
    }
}
