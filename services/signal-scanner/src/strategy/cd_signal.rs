//! MACD bottom ("CD") signal.
//!
//! Four gates, checked in order, all of which must pass:
//!
//! 1. **Liquidity**: mean dollar volume of the last 10 history bars above
//!    the threshold.
//! 2. **Underwater golden cross**: DIF was below DEA yesterday, is at or
//!    above it today, and DEA is still below zero.
//! 3. **Histogram deceleration**: the two previous histogram bars are
//!    negative and the last three are strictly increasing.
//! 4. **Bullish divergence**: inside a trailing window, the recent price low
//!    comes after the earlier low, is no more than the tolerance above it,
//!    and DIF at the recent low is not below DIF at the earlier low.

use super::{full_history, BarView, CellValue, HistoryView, ResultRow, Strategy, StrategyError};
use crate::data::FieldKey;

const CURRENT_COLUMN: &str = "Current Dollar Volume";
const AVG_COLUMN: &str = "Avg Dollar Volume (10-day)";

const FIELDS: &[FieldKey] = &[
    FieldKey::Close,
    FieldKey::Low,
    FieldKey::DollarVolume,
    FieldKey::MacdDif,
    FieldKey::MacdDea,
    FieldKey::MacdHistogram,
];

/// Thresholds for [`CdSignalStrategy`].
#[derive(Debug, Clone, PartialEq)]
pub struct CdSignalParams {
    /// Bars required, including today
    pub required_days: usize,
    /// History bars averaged for the liquidity gate
    pub liquidity_bars: usize,
    /// Mean dollar volume must be strictly above this
    pub min_avg_dollar_volume: f64,
    /// History bars (excluding today) searched for the divergence
    pub divergence_window: usize,
    /// Trailing bars (including today) holding the recent low
    pub recent_bars: usize,
    /// Recent low may sit this fraction above the earlier low
    pub price_tolerance: f64,
}

impl Default for CdSignalParams {
    fn default() -> Self {
        Self {
            required_days: 50,
            liquidity_bars: 10,
            min_avg_dollar_volume: 10_000_000.0,
            divergence_window: 30,
            recent_bars: 7,
            price_tolerance: 0.05,
        }
    }
}

/// A price low inside the divergence window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    /// Position in the window, oldest bar at 0
    pub position: usize,
    pub low: f64,
    /// DIF on the pivot bar
    pub dif: f64,
}

/// Lowest low of `lows`, first occurrence on ties, NaN lows skipped.
///
/// Positions are reported as `offset + index` so segments of one window
/// share a coordinate system.
pub fn find_pivot(lows: &[f64], difs: &[f64], offset: usize) -> Option<Pivot> {
    lows.iter()
        .zip(difs)
        .enumerate()
        .filter(|(_, (low, _))| !low.is_nan())
        .fold(None, |best: Option<Pivot>, (i, (&low, &dif))| match best {
            Some(p) if p.low <= low => Some(p),
            _ => Some(Pivot {
                position: offset + i,
                low,
                dif,
            }),
        })
}

/// Whether `recent` forms a bullish divergence against `earlier`.
///
/// The recent pivot must come strictly later, its low must not exceed the
/// earlier low by more than `tolerance`, and its DIF must be at least the
/// earlier DIF.
pub fn is_bullish_divergence(earlier: &Pivot, recent: &Pivot, tolerance: f64) -> bool {
    recent.position > earlier.position
        && recent.low <= earlier.low * (1.0 + tolerance)
        && recent.dif >= earlier.dif
}

/// Bottom reversal signal on liquid names.
#[derive(Debug, Clone, Default)]
pub struct CdSignalStrategy {
    params: CdSignalParams,
}

impl CdSignalStrategy {
    pub fn new(params: CdSignalParams) -> Self {
        Self { params }
    }

    fn avg_dollar_volume(&self, history: &HistoryView<'_>) -> Result<Option<f64>, StrategyError> {
        history
            .tail(self.params.liquidity_bars)
            .mean(FieldKey::DollarVolume)
    }

    fn liquid(&self, history: &HistoryView<'_>) -> Result<bool, StrategyError> {
        Ok(self
            .avg_dollar_volume(history)?
            .is_some_and(|avg| avg > self.params.min_avg_dollar_volume))
    }

    fn underwater_cross(today: &BarView<'_>, prev: &BarView<'_>) -> Result<bool, StrategyError> {
        let (prev_dif, prev_dea) = (prev.get(FieldKey::MacdDif)?, prev.get(FieldKey::MacdDea)?);
        let (dif, dea) = (today.get(FieldKey::MacdDif)?, today.get(FieldKey::MacdDea)?);

        Ok(prev_dif < prev_dea && dif >= dea && dea < 0.0)
    }

    fn histogram_rising(
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<bool, StrategyError> {
        let hist = history.column(FieldKey::MacdHistogram)?;
        let [h2, h1] = match hist {
            [.., a, b] => [*a, *b],
            _ => {
                return Err(StrategyError::InsufficientHistory {
                    needed: 2,
                    actual: hist.len(),
                })
            }
        };
        let h0 = today.get(FieldKey::MacdHistogram)?;

        Ok(h2 < 0.0 && h1 < 0.0 && h2 < h1 && h1 < h0)
    }

    fn divergence(
        &self,
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<bool, StrategyError> {
        let past = history.tail(self.params.divergence_window);

        let mut lows = past.column(FieldKey::Low)?.to_vec();
        let mut difs = past.column(FieldKey::MacdDif)?.to_vec();
        lows.push(today.get(FieldKey::Low)?);
        difs.push(today.get(FieldKey::MacdDif)?);

        let total = lows.len();
        if total < 2 {
            return Ok(false);
        }
        let recent_n = self.params.recent_bars.min(total - 1);
        let split = total - recent_n;

        let earlier = find_pivot(&lows[..split], &difs[..split], 0);
        let recent = find_pivot(&lows[split..], &difs[split..], split);

        Ok(match (earlier, recent) {
            (Some(e), Some(r)) => is_bullish_divergence(&e, &r, self.params.price_tolerance),
            _ => false,
        })
    }
}

impl Strategy for CdSignalStrategy {
    fn name(&self) -> &'static str {
        "CDSignalStrategy"
    }

    fn description(&self) -> &'static str {
        concat!(
            "MACD underwater golden cross with bullish divergence, ",
            "10-day avg dollar volume > $10M (sorted by avg dollar volume)"
        )
    }

    fn required_days(&self) -> usize {
        self.params.required_days
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

        Ok(self.liquid(history)?
            && Self::underwater_cross(today, &prev)?
            && Self::histogram_rising(today, history)?
            && self.divergence(today, history)?)
    }

    fn format_result(
        &self,
        symbol: &str,
        today: &BarView<'_>,
        history: &HistoryView<'_>,
    ) -> Result<ResultRow, StrategyError> {
        let avg = self
            .avg_dollar_volume(history)?
            .ok_or_else(|| StrategyError::InvalidValue("no dollar volume in history".into()))?;

        Ok(ResultRow::new(symbol)
            .with(CURRENT_COLUMN, CellValue::Money(today.get(FieldKey::DollarVolume)?))
            .with(AVG_COLUMN, CellValue::Money(avg)))
    }

    fn sort_key(&self) -> &'static str {
        AVG_COLUMN
    }
}
