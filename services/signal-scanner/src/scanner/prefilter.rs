//! Cheap universe screens applied before the scan.

use scan_common::config::PrefilterConfig;
use tracing::{debug, info};

use super::progress::ProgressLogger;
use crate::data::{FieldKey, HistoryFrame, MarketDataSource};
use crate::indicator::math;

/// A keep/drop predicate over a short history.
pub trait Prefilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bars of history the predicate looks at.
    fn lookback_days(&self) -> usize;

    /// `true` keeps the symbol.
    fn keep(&self, frame: &HistoryFrame) -> bool;
}

/// Drops illiquid and penny-priced symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityFilter {
    pub min_avg_dollar_volume: f64,
    pub min_close_price: f64,
    pub lookback_days: usize,
}

impl LiquidityFilter {
    pub fn from_config(config: &PrefilterConfig) -> Self {
        Self {
            min_avg_dollar_volume: config.min_avg_dollar_volume,
            min_close_price: config.min_close_price,
            lookback_days: config.lookback_days.max(1),
        }
    }
}

impl Prefilter for LiquidityFilter {
    fn name(&self) -> &'static str {
        "liquidity"
    }

    fn lookback_days(&self) -> usize {
        self.lookback_days
    }

    fn keep(&self, frame: &HistoryFrame) -> bool {
        let recent = frame.tail(self.lookback_days);
        let (Some(close), Some(volume)) = (
            recent.column(FieldKey::Close),
            recent.column(FieldKey::Volume),
        ) else {
            return false;
        };
        let Some(&latest) = close.last() else {
            return false;
        };
        if latest < self.min_close_price {
            return false;
        }

        let dollar_volume: Vec<f64> = close.iter().zip(volume).map(|(c, v)| c * v).collect();
        math::mean(&dollar_volume).is_some_and(|avg| avg >= self.min_avg_dollar_volume)
    }
}

/// Keep the symbols that pass every filter.
///
/// Histories come through `source`, so requests are rate limited and
/// recorded. A symbol without data is dropped.
pub async fn apply_prefilters(
    source: &MarketDataSource,
    symbols: Vec<String>,
    filters: &[Box<dyn Prefilter>],
) -> Vec<String> {
    if filters.is_empty() || symbols.is_empty() {
        return symbols;
    }

    let days = filters.iter().map(|f| f.lookback_days()).max().unwrap_or(1);
    let total = symbols.len();
    info!(total, days, filters = filters.len(), "Prefiltering universe");

    let mut progress = ProgressLogger::new("prefilter", total);
    let mut kept = Vec::new();

    for (i, symbol) in symbols.into_iter().enumerate() {
        let frame = source.history(&symbol, days).await;
        progress.log(i + 1);

        if frame.is_empty() {
            continue;
        }
        match filters.iter().find(|f| !f.keep(&frame)) {
            Some(filter) => {
                debug!(symbol = %symbol, filter = filter.name(), "Dropped by prefilter")
            }
            None => kept.push(symbol),
        }
    }

    info!(kept = kept.len(), total, "Prefilter complete");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{shared_limiter, Bar, HistoryProvider, ProviderError};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn frame(closes: &[f64], volume: f64) -> HistoryFrame {
        HistoryFrame::from_bars("T", frame_bars(closes, volume))
    }

    fn filter() -> LiquidityFilter {
        LiquidityFilter {
            min_avg_dollar_volume: 1_000_000.0,
            min_close_price: 0.5,
            lookback_days: 3,
        }
    }

    #[test]
    fn test_keeps_liquid_symbol() {
        assert!(filter().keep(&frame(&[10.0, 10.0, 10.0], 100_000.0)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // 10 * 100k = 1M exactly
        assert!(filter().keep(&frame(&[10.0], 100_000.0)));
    }

    #[test]
    fn test_drops_penny_stock() {
        assert!(!filter().keep(&frame(&[1.0, 0.4], 100_000_000.0)));
    }

    #[test]
    fn test_only_lookback_counts() {
        // Older bars are liquid, the last three are not
        let f = frame(&[100.0, 100.0, 1.0, 1.0, 1.0], 100_000.0);
        assert!(!filter().keep(&f));
    }

    #[test]
    fn test_empty_frame_dropped() {
        assert!(!filter().keep(&HistoryFrame::empty("T")));
    }

    struct VolumeBySymbol;

    #[async_trait]
    impl HistoryProvider for VolumeBySymbol {
        fn name(&self) -> &'static str {
            "volume-by-symbol"
        }

        async fn daily_bars(&self, symbol: &str, days: usize) -> Result<Vec<Bar>, ProviderError> {
            let volume = match symbol {
                "BIG" => 1_000_000.0,
                "SMALL" => 10.0,
                _ => return Err(ProviderError::EmptyResponse(symbol.into())),
            };
            let closes = vec![5.0; days];
            Ok(frame_bars(&closes, volume))
        }
    }

    fn frame_bars(closes: &[f64], volume: f64) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_prefilters() {
        let source = MarketDataSource::new(Arc::new(VolumeBySymbol), shared_limiter("test", 50));
        let filters: Vec<Box<dyn Prefilter>> = vec![Box::new(filter())];
        let symbols = vec!["SMALL".to_string(), "BIG".to_string(), "GONE".to_string()];

        let kept = apply_prefilters(&source, symbols, &filters).await;
        assert_eq!(kept, vec!["BIG".to_string()]);

        let stats = source.stats().summary().unwrap();
        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.failed_calls, 1);
    }
}
