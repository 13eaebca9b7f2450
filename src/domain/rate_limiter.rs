//! Per-instrument evaluation debounce.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
pub struct EvaluationRateLimiter {
    min_interval: Duration,
    last_evaluation: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl EvaluationRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_evaluation: Mutex::new(HashMap::new()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Records an evaluation at `now` and returns `true`, unless the previous
    /// one for `instrument` was less than `min_interval` ago. Check and
    /// record happen under one lock.
    pub fn try_begin(&self, instrument: &str, now: DateTime<Utc>) -> bool {
        let mut last = self
            .last_evaluation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = last.get(instrument)
            && now - *previous < self.min_interval
        {
            return false;
        }
        last.insert(instrument.to_string(), now);
        true
    }

    pub fn last_evaluation(&self, instrument: &str) -> Option<DateTime<Utc>> {
        self.last_evaluation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(instrument)
            .copied()
    }

    /// Forgets `instrument` so its next request is evaluated immediately.
    pub fn reset(&self, instrument: &str) {
        self.last_evaluation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(instrument);
    }
}
