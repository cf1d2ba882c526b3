//! Sliding-window rate limiter for history requests.
//!
//! Keeps the timestamps of recent calls and blocks a caller until one more
//! call fits into `max_calls` per trailing `period`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// A sliding-window rate limiter.
///
/// The whole prune-check-sleep-record sequence runs under one lock, so
/// callers are admitted one at a time in the order they reach the lock.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum calls inside one window
    max_calls: usize,
    /// Window length
    period: Duration,
    /// Timestamps of calls still inside the window, oldest first
    calls: Mutex<VecDeque<Instant>>,
    /// Name for logging
    name: String,
}

impl RateLimiter {
    /// Create a limiter allowing `max_calls` per `period`.
    ///
    /// A zero `max_calls` is treated as 1.
    pub fn new(name: impl Into<String>, max_calls: usize, period: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            max_calls,
            period,
            calls: Mutex::new(VecDeque::with_capacity(max_calls + 1)),
            name: name.into(),
        }
    }

    /// Create a limiter that admits one call every `1 / calls_per_second` seconds.
    ///
    /// Spreads requests evenly instead of allowing bursts at the start of
    /// each second.
    pub fn smoothed(name: impl Into<String>, calls_per_second: u32) -> Self {
        let per_second = f64::from(calls_per_second.max(1));
        Self::new(name, 1, Duration::from_secs_f64(1.0 / per_second))
    }

    /// Wait until one more call is allowed, then record it.
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;
        self.prune(&mut calls, Instant::now());

        if calls.len() >= self.max_calls {
            if let Some(&oldest) = calls.front() {
                let wait = self.period.saturating_sub(oldest.elapsed());
                if !wait.is_zero() {
                    debug!(
                        limiter = %self.name,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited, waiting for window"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
            self.prune(&mut calls, Instant::now());
        }

        calls.push_back(Instant::now());
    }

    /// Drop timestamps that have left the window.
    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = calls.front() {
            if now.duration_since(front) >= self.period {
                calls.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
impl RateLimiter {
    async fn calls_in_window(&self) -> usize {
        let mut calls = self.calls.lock().await;
        self.prune(&mut calls, Instant::now());
        calls.len()
    }
}

/// Shared rate limiter that can be cloned.
pub type SharedRateLimiter = Arc<RateLimiter>;

/// Create a shared smoothed limiter.
pub fn shared_limiter(name: impl Into<String>, calls_per_second: u32) -> SharedRateLimiter {
    Arc::new(RateLimiter::smoothed(name, calls_per_second))
}

// ============================================================================
// Tests
// ============================================================================
