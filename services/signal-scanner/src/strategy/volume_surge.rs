//! Dollar volume surge.

use super::{full_history, BarView, CellValue, HistoryView, ResultRow, Strategy, StrategyError};
use crate::data::FieldKey;

/// Bars averaged to form the baseline.
const BASELINE_DAYS: usize = 60;

/// Today's dollar volume must exceed this multiple of the baseline.
const SURGE_RATIO: f64 = 2.0;

const FIELDS: &[FieldKey] = &[FieldKey::DollarVolume];

/// Hit when today's dollar volume is more than twice the 60-day mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeSurgeStrategy;

impl VolumeSurgeStrategy {
    fn ratio(
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<Option<(f64, f64, f64)>, StrategyError> {
        let Some(avg) = history.mean(FieldKey::DollarVolume)? else {
            return Ok(None);
        };
        if avg <= 0.0 {
            return Ok(None);
        }
        let current = today.get(FieldKey::DollarVolume)?;
        Ok(Some((current, avg, current / avg)))
    }
}

impl Strategy for VolumeSurgeStrategy {
    fn name(&self) -> &'static str {
        "VolumeSurgeStrategy"
    }

    fn description(&self) -> &'static str {
        "Dollar volume surge (today > 2x 60-day average)"
    }

    fn required_days(&self) -> usize {
        BASELINE_DAYS + 1
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
        Ok(Self::ratio(today, history)?.is_some_and(|(_, _, ratio)| ratio > SURGE_RATIO))
    }

    fn format_result(
        &self,
        symbol: &str,
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<ResultRow, StrategyError> {
        let (current, avg, ratio) = Self::ratio(today, history)?.ok_or_else(|| {
            StrategyError::InvalidValue("60-day average dollar volume is not positive".into())
        })?;

        Ok(ResultRow::new(symbol)
            .with("Current Dollar Volume", CellValue::Money(current))
            .with("60-Day Avg Dollar Volume", CellValue::Money(avg))
            .with("Ratio", CellValue::Number((ratio * 100.0).round() / 100.0)))
    }

    fn sort_key(&self) -> &'static str {
        "Ratio"
    }
}
