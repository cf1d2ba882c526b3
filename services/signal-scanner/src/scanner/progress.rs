//! Fetch progress logging.

use std::time::{Duration, Instant};
use tracing::info;

/// Below this many symbols every step is logged.
const SMALL_UNIVERSE: usize = 20;

/// Minimum time between throttled progress lines.
const LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Percentage step that always produces a line.
const STEP_PERCENT: usize = 5;

/// Progress reporter for the fetch stage.
#[derive(Debug)]
pub struct ProgressLogger {
    label: &'static str,
    total: usize,
    started: Instant,
    last_log: Option<Instant>,
    last_step: usize,
}

impl ProgressLogger {
    pub fn new(label: &'static str, total: usize) -> Self {
        Self {
            label,
            total,
            started: Instant::now(),
            last_log: None,
            last_step: 0,
        }
    }

    /// Report that `current` of `total` items are done.
    pub fn log(&mut self, current: usize) {
        let now = Instant::now();
        if !self.should_log(current, now) {
            return;
        }

        if self.total < SMALL_UNIVERSE {
            info!(phase = self.label, current, total = self.total, "Progress");
            return;
        }

        let elapsed = now.duration_since(self.started).as_secs_f64();
        let eta = if current > 0 {
            elapsed / current as f64 * self.total.saturating_sub(current) as f64
        } else {
            0.0
        };
        info!(
            phase = self.label,
            current,
            total = self.total,
            percent = %format!("{:.1}", self.percent(current)),
            eta_secs = %format!("{:.0}", eta),
            "Progress"
        );
    }

    fn percent(&self, current: usize) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            current as f64 * 100.0 / self.total as f64
        }
    }

    /// Decide whether `current` gets a line, updating throttle state.
    fn should_log(&mut self, current: usize, now: Instant) -> bool {
        if self.total < SMALL_UNIVERSE {
            return true;
        }

        let step = current * 100 / self.total / STEP_PERCENT;
        let crossed_step = step > self.last_step;
        let interval_passed = self
            .last_log
            .map_or(true, |last| now.duration_since(last) >= LOG_INTERVAL);

        if crossed_step || interval_passed || current == self.total {
            self.last_step = self.last_step.max(step);
            self.last_log = Some(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_universe_logs_everything() {
        let mut p = ProgressLogger::new("fetch", 5);
        let now = Instant::now();
        assert!((1..=5).all(|i| p.should_log(i, now)));
    }

    #[test]
    fn test_large_universe_throttled_by_step() {
        let mut p = ProgressLogger::new("fetch", 1000);
        let now = Instant::now();

        // First call always logs (no previous line)
        assert!(p.should_log(1, now));
        let logged = (2..=1000).filter(|&i| p.should_log(i, now)).count();
        // One line per 5% step, the last of which is completion
        assert_eq!(logged, 20);
    }

    #[test]
    fn test_large_universe_interval() {
        let mut p = ProgressLogger::new("fetch", 1000);
        let now = Instant::now();
        assert!(p.should_log(1, now));
        assert!(!p.should_log(2, now + Duration::from_secs(1)));
        assert!(p.should_log(3, now + Duration::from_secs(6)));
    }

    #[test]
    fn test_log_does_not_panic_on_empty_total() {
        let mut p = ProgressLogger::new("fetch", 0);
        p.log(0);
    }
}
