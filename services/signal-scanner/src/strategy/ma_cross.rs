//! MA5 / MA10 golden cross on liquid names.

use super::{full_history, BarView, CellValue, HistoryView, ResultRow, Strategy, StrategyError};
use crate::data::FieldKey;

/// Minimum mean dollar volume over the history bars.
const MIN_AVG_DOLLAR_VOLUME: f64 = 50_000_000.0;

const AVG_COLUMN: &str = "Avg Dollar Volume (10-day)";

const FIELDS: &[FieldKey] = &[
    FieldKey::Close,
    FieldKey::DollarVolume,
    FieldKey::Ma5,
    FieldKey::Ma10,
];

/// Hit when MA5 closes above MA10 today after being at or below it
/// yesterday, with more than $50M average dollar volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaCrossStrategy;

impl Strategy for MaCrossStrategy {
    fn name(&self) -> &'static str {
        "MACrossStrategy"
    }

    fn description(&self) -> &'static str {
        "MA5 crosses above MA10 with high dollar volume"
    }

    fn required_days(&self) -> usize {
        11
    }

    fn required_fields(&self) -> &'static [FieldKey] {
        FIELDS
    }

    fn check_condition(
        &self,
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<bool, StrategyError> {
        if !full_history(self, history) {
            return Ok(false);
        }
        let Some(prev) = history.last() else {
            return Ok(false);
        };

        let crossed = today.get(FieldKey::Ma5)? > today.get(FieldKey::Ma10)?
            && prev.get(FieldKey::Ma5)? <= prev.get(FieldKey::Ma10)?;
        if !crossed {
            return Ok(false);
        }

        Ok(history
            .mean(FieldKey::DollarVolume)?
            .is_some_and(|avg| avg > MIN_AVG_DOLLAR_VOLUME))
    }

    fn format_result(
        &self,
        symbol: &str,
        _today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<ResultRow, StrategyError> {
        let avg = history
            .mean(FieldKey::DollarVolume)?
            .ok_or_else(|| StrategyError::InvalidValue("no dollar volume in history".into()))?;

        Ok(ResultRow::new(symbol).with(AVG_COLUMN, CellValue::Money(avg)))
    }

    fn sort_key(&self) -> &'static str {
        AVG_COLUMN
    }
}
