//! Column-oriented daily history for one symbol.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

use super::{Bar, FieldKey};

/// Raised when a column does not line up with the frame's rows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("column {field} has {actual} rows but the frame has {expected}")]
pub struct ColumnLengthError {
    pub field: FieldKey,
    pub expected: usize,
    pub actual: usize,
}

/// Ordered daily bars for one symbol, stored column by column.
///
/// Dates are strictly increasing. A column is present if and only if it has
/// been supplied by the provider or computed by an indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFrame {
    symbol: String,
    dates: Vec<NaiveDate>,
    columns: BTreeMap<FieldKey, Vec<f64>>,
}

impl HistoryFrame {
    /// A frame with no rows and no columns ("no data available").
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            dates: Vec::new(),
            columns: BTreeMap::new(),
        }
    }

    /// Build a frame from provider bars.
    ///
    /// Bars are sorted by date; when a date repeats the last bar wins.
    pub fn from_bars(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        if bars.is_empty() {
            return Self::empty(symbol);
        }

        bars.sort_by_key(|b| b.date);
        bars.reverse();
        bars.dedup_by_key(|b| b.date);
        bars.reverse();

        let mut columns = BTreeMap::new();
        columns.insert(FieldKey::Open, bars.iter().map(|b| b.open).collect());
        columns.insert(FieldKey::High, bars.iter().map(|b| b.high).collect());
        columns.insert(FieldKey::Low, bars.iter().map(|b| b.low).collect());
        columns.insert(FieldKey::Close, bars.iter().map(|b| b.close).collect());
        columns.insert(FieldKey::Volume, bars.iter().map(|b| b.volume).collect());

        Self {
            symbol: symbol.into(),
            dates: bars.iter().map(|b| b.date).collect(),
            columns,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of rows (bars).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Whether a column exists.
    pub fn has(&self, field: FieldKey) -> bool {
        self.columns.contains_key(&field)
    }

    /// Column values, oldest first.
    pub fn column(&self, field: FieldKey) -> Option<&[f64]> {
        self.columns.get(&field).map(Vec::as_slice)
    }

    /// Insert or replace a column.
    pub fn set_column(
        &mut self,
        field: FieldKey,
        values: Vec<f64>,
    ) -> Result<(), ColumnLengthError> {
        if values.len() != self.len() {
            return Err(ColumnLengthError {
                field,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(field, values);
        Ok(())
    }

    /// A new frame holding the last `n` rows of every column.
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            symbol: self.symbol.clone(),
            dates: self.dates[start..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (*k, v[start..].to_vec()))
                .collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
        }
    }

    #[test]
    fn test_from_bars_sorts_and_dedups() {
        let bars = vec![bar(3, 30.0), bar(1, 10.0), bar(2, 20.0), bar(3, 31.0)];
        let frame = HistoryFrame::from_bars("AAPL", bars);

        assert_eq!(frame.len(), 3);
        assert_eq!(frame.column(FieldKey::Close).unwrap(), &[10.0, 20.0, 31.0]);
        assert!(frame.dates().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(frame.dates().last(), NaiveDate::from_ymd_opt(2024, 1, 3).as_ref());
    }

    #[test]
    fn test_raw_columns_only() {
        let frame = HistoryFrame::from_bars("AAPL", vec![bar(1, 10.0)]);
        for field in [
            FieldKey::Open,
            FieldKey::High,
            FieldKey::Low,
            FieldKey::Close,
            FieldKey::Volume,
        ] {
            assert!(frame.has(field));
        }
        assert!(!frame.has(FieldKey::DollarVolume));
        assert!(!frame.has(FieldKey::Ma5));
    }

    #[test]
    fn test_empty_frame() {
        let frame = HistoryFrame::from_bars("AAPL", Vec::new());
        assert!(frame.is_empty());
        assert!(!frame.has(FieldKey::Close));
        assert_eq!(frame.symbol(), "AAPL");
    }

    #[test]
    fn test_set_column_length_mismatch() {
        let mut frame = HistoryFrame::from_bars("AAPL", vec![bar(1, 10.0), bar(2, 11.0)]);
        let err = frame.set_column(FieldKey::Ma5, vec![1.0]).unwrap_err();
        assert_eq!(err.expected, 2);
        assert_eq!(err.actual, 1);
        assert!(!frame.has(FieldKey::Ma5));

        frame.set_column(FieldKey::Ma5, vec![1.0, 2.0]).unwrap();
        assert!(frame.has(FieldKey::Ma5));
    }

    #[test]
    fn test_tail() {
        let frame = HistoryFrame::from_bars(
            "AAPL",
            vec![bar(1, 10.0), bar(2, 11.0), bar(3, 12.0), bar(4, 13.0)],
        );
        let tail = frame.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.column(FieldKey::Close).unwrap(), &[12.0, 13.0]);
        assert_eq!(frame.tail(10).len(), 4);
    }
}
