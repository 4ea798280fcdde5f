/// Sliding-window rate limiter
///
/// Shared store injected into every `RateLimitMiddleware`. Each identifier owns
/// the timestamps of its allowed requests inside the trailing window. Denials
/// never consume a slot.
///
/// Memory is bounded by a probabilistic sweep that runs inline on ~1% of calls;
/// `sweep_at` is also public for periodic callers.

use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow,
    Deny { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allow)
    }
}

/// Timestamps (ms) of allowed requests, oldest first, plus the window length
/// of the rule that last checked this identifier
#[derive(Default)]
struct RateWindow {
    timestamps: VecDeque<i64>,
    window_ms: i64,
}

impl RateWindow {
    fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.window_ms;
        while matches!(self.timestamps.front(), Some(ts) if *ts <= cutoff) {
            self.timestamps.pop_front();
        }
    }
}

pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    sweep_probability: f64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_sweep_probability(DEFAULT_SWEEP_PROBABILITY)
    }

    /// Probability in `[0, 1]` that a call also sweeps expired identifiers
    pub fn with_sweep_probability(probability: f64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            sweep_probability: probability.clamp(0.0, 1.0),
        }
    }

    /// Checks and records a request from `identifier` at the current time
    pub fn check(&self, identifier: &str, window_ms: u64, max_requests: u32) -> RateDecision {
        self.check_at(identifier, window_ms, max_requests, now_millis())
    }

    /// Same as `check`, with an explicit clock reading in milliseconds
    pub fn check_at(
        &self,
        identifier: &str,
        window_ms: u64,
        max_requests: u32,
        now_ms: i64,
    ) -> RateDecision {
        let window_ms = window_ms as i64;
        // Prune, count and append happen under one lock
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.sweep_probability > 0.0 && rand::thread_rng().gen_bool(self.sweep_probability) {
            let removed = sweep_windows(&mut windows, now_ms);
            tracing::debug!(removed, "Rate limiter sweep");
        }

        let window = windows.entry(identifier.to_string()).or_default();
        window.window_ms = window_ms;
        window.prune(now_ms);

        if window.timestamps.len() >= max_requests as usize {
            let oldest = window.timestamps.front().copied().unwrap_or(now_ms);
            let wait_ms = (oldest + window_ms - now_ms).max(0);
            let retry_after_secs = ((wait_ms + 999) / 1000) as u64;
            return RateDecision::Deny { retry_after_secs };
        }

        window.timestamps.push_back(now_ms);
        RateDecision::Allow
    }

    /// Drops identifiers whose whole window has expired, each judged by its own
    /// window length; returns how many were removed
    pub fn sweep_at(&self, now_ms: i64) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sweep_windows(&mut windows, now_ms)
    }

    /// Number of identifiers currently holding a window
    pub fn tracked_identifiers(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

fn sweep_windows(windows: &mut HashMap<String, RateWindow>, now_ms: i64) -> usize {
    let before = windows.len();
    windows.retain(|_, window| {
        window.prune(now_ms);
        !window.timestamps.is_empty()
    });
    before - windows.len()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
