//! In-memory sliding-window rate limiter.
//!
//! Each caller identifier owns an ordered list of request timestamps. On every
//! check, timestamps older than the window are dropped before the remaining
//! count is compared with the budget. State is per-process only.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::config::RateLimitSettings;

/// Number of tracked keys above which idle keys are purged on the next check.
const PURGE_THRESHOLD: usize = 10_000;

/// The caller has used up its budget for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Rate limit exceeded")]
pub struct RateLimitExceeded;

/// Sliding-window request counter keyed by caller identifier.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    trust_forwarded: bool,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    windows: HashMap<String, VecDeque<Instant>>,
    last_purge: Option<Instant>,
}

impl LimiterState {
    /// Purge idle keys once the map is large, at most once per window.
    fn maybe_purge(&mut self, window: Duration, now: Instant) {
        if self.windows.len() < PURGE_THRESHOLD {
            return;
        }
        let due = self
            .last_purge
            .map_or(true, |last| now.saturating_duration_since(last) >= window);
        if due {
            self.purge(window, now);
        }
    }

    fn purge(&mut self, window: Duration, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            prune(timestamps, window, now);
            !timestamps.is_empty()
        });
        self.last_purge = Some(now);
        debug!(before = before, after = self.windows.len(), "rate_limit_keys_purged");
    }
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            trust_forwarded: false,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn from_settings(settings: RateLimitSettings) -> Self {
        Self {
            trust_forwarded: settings.trust_forwarded,
            ..Self::new(settings.max_requests, settings.window)
        }
    }

    /// Whether callers may be keyed by their `X-Forwarded-For` header.
    pub fn trust_forwarded(&self) -> bool {
        self.trust_forwarded
    }

    /// Record a request for `key` now, or reject it if the budget is spent.
    pub fn check(&self, key: &str) -> Result<(), RateLimitExceeded> {
        self.check_at(key, Instant::now())
    }

    /// Record a request for `key` at `now`, or reject it if the budget is spent.
    ///
    /// Rejected requests are not recorded.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimitExceeded> {
        // A poisoned lock only means another check panicked; the map is still usable.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.maybe_purge(self.window, now);

        let timestamps = state.windows.entry(key.to_string()).or_default();
        prune(timestamps, self.window, now);

        if timestamps.len() >= self.max_requests {
            debug!(key = %key, count = timestamps.len(), "rate_limit_exceeded");
            return Err(RateLimitExceeded);
        }

        timestamps.push_back(now);
        Ok(())
    }

    /// Drop keys with no timestamps left inside the window.
    pub fn purge_idle(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.purge(self.window, now);
    }

    /// Number of caller identifiers currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .windows
            .len()
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, window: Duration, now: Instant) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) < window {
            break;
        }
        timestamps.pop_front();
    }
}
