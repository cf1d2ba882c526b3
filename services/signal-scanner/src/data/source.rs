//! Rate-limited, failure-absorbing access to daily history.
//!
//! Every history request in the scanner goes through [`MarketDataSource`]:
//! it waits on the shared limiter, calls the provider, records timings, and
//! turns any failure into an empty frame.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::provider::{HistoryProvider, ProviderError};
use super::rate_limiter::SharedRateLimiter;
use super::stats::RequestStats;
use super::HistoryFrame;

/// History access shared by the prefilter and the scan.
#[derive(Clone)]
pub struct MarketDataSource {
    provider: Arc<dyn HistoryProvider>,
    limiter: SharedRateLimiter,
    stats: Arc<RequestStats>,
}

impl MarketDataSource {
    pub fn new(provider: Arc<dyn HistoryProvider>, limiter: SharedRateLimiter) -> Self {
        Self {
            provider,
            limiter,
            stats: Arc::new(RequestStats::new()),
        }
    }

    /// Request statistics for calls made through this source.
    pub fn stats(&self) -> &RequestStats {
        &self.stats
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Fetch the most recent `days` daily bars for `symbol`.
    ///
    /// Never fails: an invalid request, a provider error or panic, and an
    /// empty response all come back as an empty frame, which callers read
    /// as "no data for this symbol".
    pub async fn history(&self, symbol: &str, days: usize) -> HistoryFrame {
        if days == 0 {
            warn!(symbol = %symbol, days, "Invalid history length requested");
            return HistoryFrame::empty(symbol);
        }

        let start = Instant::now();
        self.limiter.acquire().await;
        let acquired = Instant::now();

        // A panicking provider costs only this symbol
        let outcome = AssertUnwindSafe(self.provider.daily_bars(symbol, days))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ProviderError::Provider("provider panicked".into())));
        let finished = Instant::now();

        let frame = match outcome {
            Ok(bars) if bars.is_empty() => {
                warn!(symbol = %symbol, provider = self.provider.name(), "Empty history");
                HistoryFrame::empty(symbol)
            }
            Ok(bars) => {
                debug!(symbol = %symbol, bars = bars.len(), "History fetched");
                HistoryFrame::from_bars(symbol, bars)
            }
            Err(e) if e.is_transient() => {
                warn!(
                    symbol = %symbol,
                    provider = self.provider.name(),
                    error = %e,
                    "History request failed"
                );
                HistoryFrame::empty(symbol)
            }
            Err(e) => {
                error!(
                    symbol = %symbol,
                    provider = self.provider.name(),
                    error = %e,
                    "History request failed"
                );
                HistoryFrame::empty(symbol)
            }
        };

        self.stats.record(
            !frame.is_empty(),
            acquired.duration_since(start),
            finished.duration_since(acquired),
            start.elapsed(),
        );

        frame
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{shared_limiter, Bar, FieldKey};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HistoryProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn daily_bars(&self, symbol: &str, days: usize) -> Result<Vec<Bar>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match symbol {
                "FAIL" => Err(ProviderError::Network("connection reset".into())),
                "NONE" => Ok(Vec::new()),
                "PANIC" => panic!("provider bug"),
                _ => Ok((0..days)
                    .map(|i| Bar {
                        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                            + chrono::Duration::days(i as i64),
                        open: 10.0,
                        high: 11.0,
                        low: 9.0,
                        close: 10.0 + i as f64,
                        volume: 1_000.0,
                    })
                    .collect()),
            }
        }
    }

    fn source() -> (MarketDataSource, Arc<FixedProvider>) {
        let provider = Arc::new(FixedProvider {
            calls: AtomicUsize::new(0),
        });
        let source = MarketDataSource::new(provider.clone(), shared_limiter("test", 100));
        (source, provider)
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_success() {
        let (source, _) = source();
        let frame = source.history("AAPL", 5).await;

        assert_eq!(frame.len(), 5);
        assert_eq!(frame.symbol(), "AAPL");
        assert_eq!(frame.column(FieldKey::Close).unwrap()[4], 14.0);

        let s = source.stats().summary().unwrap();
        assert_eq!(s.total_calls, 1);
        assert_eq!(s.failed_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_become_empty_frames() {
        let (source, _) = source();

        assert!(source.history("FAIL", 5).await.is_empty());
        assert!(source.history("NONE", 5).await.is_empty());

        let s = source.stats().summary().unwrap();
        assert_eq!(s.total_calls, 2);
        assert_eq!(s.failed_calls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_panic_becomes_empty_frame() {
        let (source, _) = source();

        assert!(source.history("PANIC", 5).await.is_empty());
        // The limiter and stats stay usable afterwards
        assert_eq!(source.history("AAPL", 5).await.len(), 5);

        let s = source.stats().summary().unwrap();
        assert_eq!(s.total_calls, 2);
        assert_eq!(s.failed_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_days_skips_provider() {
        let (source, provider) = source();

        let frame = source.history("AAPL", 0).await;
        assert!(frame.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(source.stats().summary().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_time_recorded() {
        let provider = Arc::new(FixedProvider {
            calls: AtomicUsize::new(0),
        });
        // One call per second
        let source = MarketDataSource::new(provider, shared_limiter("test", 1));

        source.history("AAPL", 1).await;
        source.history("MSFT", 1).await;

        let s = source.stats().summary().unwrap();
        assert!(s.max_wait_ms >= 999.0);
        assert!(s.avg_wait_ms >= 499.0);
    }
}
