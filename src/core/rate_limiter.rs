//! Sliding-window rate limiter over per-model call history

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use crate::config;
use crate::types::RateLimitPolicy;

/// Width of the per-minute window
pub const TIME_WINDOW: Duration = Duration::from_millis(60_000);

const SECOND_WINDOW: Duration = Duration::from_millis(1000);

/// Tracks recent call timestamps per model and enforces rpm/rps ceilings.
///
/// Admission is check-then-commit: a timestamp is recorded only when the call
/// is admitted, so a deferred call leaves no trace in the history. Callers
/// sleep for the returned duration and retry admission.
#[derive(Debug, Default)]
pub struct RateLimiter {
    history: HashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            history: HashMap::new(),
        }
    }

    /// Admission check for one call to `model` under its registered policy.
    /// Returns `Duration::ZERO` when admitted, else the time to wait before
    /// trying again.
    pub fn admit(&mut self, model: &str) -> Duration {
        self.admit_with(model, config::rate_limit_policy(model))
    }

    pub fn admit_with(&mut self, model: &str, policy: RateLimitPolicy) -> Duration {
        let now = Instant::now();
        let history = self.history.entry(model.to_string()).or_default();

        while history
            .front()
            .is_some_and(|t| now.duration_since(*t) >= TIME_WINDOW)
        {
            history.pop_front();
        }

        if history.len() as u32 >= policy.rpm {
            if let Some(oldest) = history.front() {
                return TIME_WINDOW.saturating_sub(now.duration_since(*oldest));
            }
        }

        // Timestamps are monotonic, so the entries inside the last second
        // form a suffix of the history.
        let in_last_second = history
            .iter()
            .rev()
            .take_while(|t| now.duration_since(**t) < SECOND_WINDOW)
            .count();
        if in_last_second as u32 >= policy.rps {
            if let Some(oldest_in_second) = history.get(history.len() - in_last_second) {
                return SECOND_WINDOW.saturating_sub(now.duration_since(*oldest_in_second));
            }
        }

        history.push_back(now);
        Duration::ZERO
    }

    /// Recorded calls for `model` still inside the per-minute window.
    pub fn window_len(&self, model: &str) -> usize {
        self.history.get(model).map_or(0, VecDeque::len)
    }
}
