//! Request statistics for the data source.
//!
//! Pure accumulation of call outcomes and timings, read back as a summary.
//! Observability only; nothing in the pipeline branches on these numbers.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone)]
struct Counters {
    total_calls: u64,
    failed_calls: u64,
    total_wait: Duration,
    total_request: Duration,
    total_time: Duration,
    max_wait: Duration,
    max_request: Duration,
    max_total: Duration,
}

/// Thread-safe request statistics.
#[derive(Debug, Default)]
pub struct RequestStats {
    counters: Mutex<Counters>,
}

/// Snapshot of [`RequestStats`]; latencies in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_calls: u64,
    pub failed_calls: u64,
    /// Failed / total, 0.0 - 1.0
    pub failure_rate: f64,
    pub avg_wait_ms: f64,
    pub avg_request_ms: f64,
    pub avg_total_ms: f64,
    pub max_wait_ms: f64,
    pub max_request_ms: f64,
    pub max_total_ms: f64,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call.
    pub fn record(&self, success: bool, wait: Duration, request: Duration, total: Duration) {
        let mut c = self.counters.lock().unwrap_or_else(PoisonError::into_inner);

        c.total_calls += 1;
        if !success {
            c.failed_calls += 1;
        }

        c.total_wait += wait;
        c.total_request += request;
        c.total_time += total;

        c.max_wait = c.max_wait.max(wait);
        c.max_request = c.max_request.max(request);
        c.max_total = c.max_total.max(total);
    }

    /// Clear all counters.
    pub fn reset(&self) {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner) = Counters::default();
    }

    /// Summary of recorded calls, `None` when nothing was recorded.
    pub fn summary(&self) -> Option<StatsSummary> {
        let c = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if c.total_calls == 0 {
            return None;
        }

        let n = c.total_calls as f64;
        Some(StatsSummary {
            total_calls: c.total_calls,
            failed_calls: c.failed_calls,
            failure_rate: c.failed_calls as f64 / n,
            avg_wait_ms: millis(c.total_wait) / n,
            avg_request_ms: millis(c.total_request) / n,
            avg_total_ms: millis(c.total_time) / n,
            max_wait_ms: millis(c.max_wait),
            max_request_ms: millis(c.max_request),
            max_total_ms: millis(c.max_total),
        })
    }

    /// Log the summary under a phase title (e.g. "Prefilter", "Run").
    pub fn log_summary(&self, title: &str) {
        match self.summary() {
            Some(s) => info!(
                phase = title,
                total_calls = s.total_calls,
                failed_calls = s.failed_calls,
                failure_pct = %format!("{:.1}", s.failure_rate * 100.0),
                avg_wait_ms = %format!("{:.1}", s.avg_wait_ms),
                avg_request_ms = %format!("{:.1}", s.avg_request_ms),
                avg_total_ms = %format!("{:.1}", s.avg_total_ms),
                max_wait_ms = %format!("{:.1}", s.max_wait_ms),
                max_request_ms = %format!("{:.1}", s.max_request_ms),
                max_total_ms = %format!("{:.1}", s.max_total_ms),
                "Request stats"
            ),
            None => info!(phase = title, "No requests recorded"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
