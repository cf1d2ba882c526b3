//! Signal strategies.
//!
//! A [`Strategy`] declares how much history it needs and which fields must
//! exist, decides whether the latest bar satisfies its rule, and formats a
//! display row for hits.
//!
//! # Built-in Strategies
//! - **VolumeSurgeStrategy**: dollar volume more than twice its 60-day mean
//! - **MACrossStrategy**: MA5 crossing above MA10 on a liquid name
//! - **CDSignalStrategy**: MACD underwater golden cross with bullish divergence

pub mod catalog;
mod cd_signal;
mod ma_cross;
mod row;
mod volume_surge;

pub use cd_signal::{find_pivot, is_bullish_divergence, CdSignalParams, CdSignalStrategy, Pivot};
pub use ma_cross::MaCrossStrategy;
pub use row::{format_money, CellValue, ResultRow, SYMBOL_COLUMN};
pub use volume_surge::VolumeSurgeStrategy;

use thiserror::Error;

use crate::data::{FieldKey, HistoryFrame};
use crate::indicator::math;

// ============================================================================
// Errors
// ============================================================================

/// Failure while evaluating one strategy on one symbol.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StrategyError {
    #[error("field {0} is not present")]
    MissingField(FieldKey),

    #[error("need {needed} history bars, have {actual}")]
    InsufficientHistory { needed: usize, actual: usize },

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

// ============================================================================
// Views
// ============================================================================

/// One bar of a preprocessed frame.
#[derive(Debug, Clone, Copy)]
pub struct BarView<'a> {
    frame: &'a HistoryFrame,
    index: usize,
}

impl<'a> BarView<'a> {
    /// Value of `field` on this bar.
    pub fn get(&self, field: FieldKey) -> Result<f64, StrategyError> {
        self.frame
            .column(field)
            .map(|c| c[self.index])
            .ok_or(StrategyError::MissingField(field))
    }
}

/// A contiguous run of bars, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct HistoryView<'a> {
    frame: &'a HistoryFrame,
    start: usize,
    end: usize,
}

impl<'a> HistoryView<'a> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Values of `field` across the run.
    pub fn column(&self, field: FieldKey) -> Result<&'a [f64], StrategyError> {
        self.frame
            .column(field)
            .map(|c| &c[self.start..self.end])
            .ok_or(StrategyError::MissingField(field))
    }

    /// The `i`-th bar of the run.
    pub fn bar(&self, i: usize) -> Option<BarView<'a>> {
        (i < self.len()).then_some(BarView {
            frame: self.frame,
            index: self.start + i,
        })
    }

    /// The most recent bar of the run.
    pub fn last(&self) -> Option<BarView<'a>> {
        self.len().checked_sub(1).and_then(|i| self.bar(i))
    }

    /// The trailing `n` bars (or all of them when shorter).
    pub fn tail(&self, n: usize) -> HistoryView<'a> {
        HistoryView {
            frame: self.frame,
            start: self.end.saturating_sub(n).max(self.start),
            end: self.end,
        }
    }

    /// Mean of `field` over the run, ignoring undefined values.
    pub fn mean(&self, field: FieldKey) -> Result<Option<f64>, StrategyError> {
        Ok(math::mean(self.column(field)?))
    }
}

/// Split the last `days` rows of `frame` into today and the preceding bars.
///
/// Returns `None` when the frame is shorter than `days` or `days` is zero.
pub fn window(frame: &HistoryFrame, days: usize) -> Option<(BarView<'_>, HistoryView<'_>)> {
    if days == 0 || frame.len() < days {
        return None;
    }
    let today = frame.len() - 1;
    Some((
        BarView { frame, index: today },
        HistoryView {
            frame,
            start: frame.len() - days,
            end: today,
        },
    ))
}

// ============================================================================
// Strategy Trait
// ============================================================================

/// A named signal rule evaluated on the latest bar of a preprocessed frame.
pub trait Strategy: Send + Sync {
    /// Unique name, used as the result key.
    fn name(&self) -> &'static str;

    /// Human description for reports.
    fn description(&self) -> &'static str;

    /// Bars needed, including today.
    fn required_days(&self) -> usize;

    /// Fields that must exist after preprocessing.
    fn required_fields(&self) -> &'static [FieldKey];

    /// Whether today satisfies the rule given the preceding
    /// `required_days() - 1` bars.
    fn check_condition(
        &self,
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<bool, StrategyError>;

    /// Display row for a hit. The first cell is always `Symbol`.
    fn format_result(
        &self,
        symbol: &str,
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<ResultRow, StrategyError>;

    /// Column of the formatted row to sort hits by.
    fn sort_key(&self) -> &'static str;

    /// Sort direction; descending unless overridden.
    fn sort_ascending(&self) -> bool {
        false
    }
}

/// Whether `history` has exactly the bars `strategy` expects before today.
pub(crate) fn full_history(strategy: &dyn Strategy, history: &HistoryView<'_>) -> bool {
    let expected = strategy.required_days().saturating_sub(1);
    if history.len() != expected {
        tracing::warn!(
            strategy = strategy.name(),
            expected,
            actual = history.len(),
            "Unexpected history length"
        );
        return false;
    }
    true
}

/// Evaluate `strategy` on the tail of a preprocessed frame.
///
/// `Ok(None)` when the frame is too short or the rule does not hold.
pub fn evaluate(
    strategy: &dyn Strategy,
    frame: &HistoryFrame,
) -> Result<Option<ResultRow>, StrategyError> {
    let Some((today, history)) = window(frame, strategy.required_days()) else {
        return Ok(None);
    };

    if strategy.check_condition(&today, &history)? {
        strategy
            .format_result(frame.symbol(), &today, &history)
            .map(Some)
    } else {
        Ok(None)
    }
}

// ============================================================================
// Test Support
// ============================================================================


#[cfg(test)]
mod tests {
    use super::testing::frame_with;
    use super::*;

    #[test]
    fn test_window_split() {
        let closes: Vec<f64> = (0..10).map(f64::from).collect();
        let frame = frame_with(10, vec![(FieldKey::Close, closes)]);

        let (today, history) = window(&frame, 4).unwrap();
        assert_eq!(today.get(FieldKey::Close).unwrap(), 9.0);
        assert_eq!(history.len(), 3);
        assert_eq!(history.column(FieldKey::Close).unwrap(), &[6.0, 7.0, 8.0]);
        assert_eq!(history.last().unwrap().get(FieldKey::Close).unwrap(), 8.0);
        assert_eq!(history.tail(2).column(FieldKey::Close).unwrap(), &[7.0, 8.0]);
        assert_eq!(history.tail(99).len(), 3);

        assert!(window(&frame, 11).is_none());
        assert!(window(&frame, 0).is_none());
    }

    #[test]
    fn test_missing_field() {
        let frame = frame_with(3, vec![]);
        let (today, history) = window(&frame, 3).unwrap();
        assert_eq!(
            today.get(FieldKey::Ma5),
            Err(StrategyError::MissingField(FieldKey::Ma5))
        );
        assert!(history.mean(FieldKey::MacdDif).is_err());
    }

    #[test]
    fn test_single_day_window_has_empty_history() {
        let frame = frame_with(3, vec![]);
        let (_, history) = window(&frame, 1).unwrap();
        assert!(history.is_empty());
        assert!(history.last().is_none());
        assert_eq!(history.mean(FieldKey::Close).unwrap(), None);
    }
}
