//! Indicator engine.
//!
//! An [`IndicatorEngine`] is an explicit registry of indicator families.
//! Each family declares the fields it produces; [`IndicatorEngine::preprocess`]
//! runs only the families whose outputs are requested and still missing,
//! in registration order, and returns a new enriched frame.
//!
//! # Built-in Indicators
//! - **DollarVolume**: close * volume
//! - **MA**: 5 and 10 bar simple moving averages of close
//! - **MACD (12, 26, 9)**: DIF, DEA and histogram

mod builtin;
pub mod math;

use thiserror::Error;
use tracing::debug;

use crate::data::{ColumnLengthError, FieldKey, HistoryFrame};

pub use builtin::{dollar_volume, macd, moving_averages};

// ============================================================================
// Errors
// ============================================================================

/// Failure to derive the fields a symbol's strategies need.
#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("history for {0} is empty")]
    EmptyFrame(String),

    #[error("indicator {indicator} needs field {field}")]
    MissingInput { indicator: String, field: FieldKey },

    #[error("indicator {indicator} failed: {source}")]
    Indicator {
        indicator: String,
        #[source]
        source: Box<ComputationError>,
    },

    #[error(transparent)]
    Column(#[from] ColumnLengthError),

    #[error("fields still missing after preprocessing: {}", join_fields(.0))]
    MissingFields(Vec<FieldKey>),

    #[error("indicator {0} is already registered")]
    DuplicateIndicator(String),
}

fn join_fields(fields: &[FieldKey]) -> String {
    fields
        .iter()
        .map(FieldKey::column_name)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Indicator
// ============================================================================

/// Computed columns, one entry per output field.
pub type Columns = Vec<(FieldKey, Vec<f64>)>;

type Transform = Box<dyn Fn(&HistoryFrame) -> Result<Columns, ComputationError> + Send + Sync>;

/// A named family of derived columns.
pub struct Indicator {
    name: String,
    outputs: Vec<FieldKey>,
    transform: Transform,
}

impl Indicator {
    pub fn new<F>(name: impl Into<String>, outputs: impl Into<Vec<FieldKey>>, transform: F) -> Self
    where
        F: Fn(&HistoryFrame) -> Result<Columns, ComputationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            outputs: outputs.into(),
            transform: Box::new(transform),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compute this family's columns from `frame`.
    pub fn compute(&self, frame: &HistoryFrame) -> Result<Columns, ComputationError> {
        (self.transform)(frame)
    }
}

impl std::fmt::Debug for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indicator")
            .field("name", &self.name)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Fetch an input column or report which indicator needed it.
pub fn input<'a>(
    frame: &'a HistoryFrame,
    indicator: &str,
    field: FieldKey,
) -> Result<&'a [f64], ComputationError> {
    frame.column(field).ok_or_else(|| ComputationError::MissingInput {
        indicator: indicator.to_string(),
        field,
    })
}

// ============================================================================
// Indicator Engine
// ============================================================================

/// Registry of indicator families, applied in registration order.
#[derive(Debug, Default)]
pub struct IndicatorEngine {
    indicators: Vec<Indicator>,
}

impl IndicatorEngine {
    /// An engine with no indicators.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with DollarVolume, MA and MACD registered.
    pub fn with_builtin() -> Self {
        Self {
            indicators: vec![dollar_volume(), moving_averages(), macd()],
        }
    }

    /// Register a family. Names must be unique.
    pub fn register(&mut self, indicator: Indicator) -> Result<(), ComputationError> {
        if self.indicators.iter().any(|i| i.name == indicator.name) {
            return Err(ComputationError::DuplicateIndicator(indicator.name));
        }
        self.indicators.push(indicator);
        Ok(())
    }

    /// Return a copy of `frame` carrying every field in `required`.
    ///
    /// A family runs only when one of its outputs is required and not all of
    /// them exist yet. Fails if a family fails or if any required field is
    /// still absent afterwards.
    pub fn preprocess(
        &self,
        frame: &HistoryFrame,
        required: &[FieldKey],
    ) -> Result<HistoryFrame, ComputationError> {
        if frame.is_empty() {
            return Err(ComputationError::EmptyFrame(frame.symbol().to_string()));
        }

        let mut enriched = frame.clone();

        for indicator in &self.indicators {
            if !indicator.outputs.iter().any(|f| required.contains(f)) {
                continue;
            }
            if indicator.outputs.iter().all(|f| enriched.has(*f)) {
                continue;
            }

            debug!(
                symbol = %enriched.symbol(),
                indicator = %indicator.name,
                "Computing indicator"
            );

            let columns = indicator
                .compute(&enriched)
                .map_err(|e| ComputationError::Indicator {
                    indicator: indicator.name.clone(),
                    source: Box::new(e),
                })?;

            for (field, values) in columns {
                enriched.set_column(field, values)?;
            }
        }

        let mut missing: Vec<FieldKey> = required
            .iter()
            .copied()
            .filter(|f| !enriched.has(*f))
            .collect();
        if !missing.is_empty() {
            missing.sort();
            missing.dedup();
            return Err(ComputationError::MissingFields(missing));
        }

        Ok(enriched)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn frame(n: usize) -> HistoryFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| {
                let close = 20.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.05;
                Bar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close - 0.2,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 1_000_000.0 + i as f64 * 1_000.0,
                }
            })
            .collect();
        HistoryFrame::from_bars("TEST", bars)
    }

    const ALL_DERIVED: [FieldKey; 6] = [
        FieldKey::DollarVolume,
        FieldKey::Ma5,
        FieldKey::Ma10,
        FieldKey::MacdDif,
        FieldKey::MacdDea,
        FieldKey::MacdHistogram,
    ];

    #[test]
    fn test_preprocess_only_requested() {
        let engine = IndicatorEngine::with_builtin();
        let out = engine.preprocess(&frame(30), &[FieldKey::Ma5]).unwrap();

        assert!(out.has(FieldKey::Ma5));
        assert!(out.has(FieldKey::Ma10));
        assert!(!out.has(FieldKey::DollarVolume));
        assert!(!out.has(FieldKey::MacdDif));
    }

    #[test]
    fn test_preprocess_leaves_input_untouched() {
        let engine = IndicatorEngine::with_builtin();
        let input = frame(30);
        let _ = engine.preprocess(&input, &ALL_DERIVED).unwrap();
        assert!(!input.has(FieldKey::DollarVolume));
    }

    #[test]
    fn test_preprocess_idempotent() {
        let engine = IndicatorEngine::with_builtin();
        let once = engine.preprocess(&frame(60), &ALL_DERIVED).unwrap();
        let twice = engine.preprocess(&once, &ALL_DERIVED).unwrap();

        for field in ALL_DERIVED {
            let a = once.column(field).unwrap();
            let b = twice.column(field).unwrap();
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b) {
                assert!(x.to_bits() == y.to_bits(), "{} differs", field);
            }
        }
    }

    #[test]
    fn test_macd_histogram_identity() {
        let engine = IndicatorEngine::with_builtin();
        let out = engine
            .preprocess(&frame(80), &[FieldKey::MacdHistogram])
            .unwrap();

        let dif = out.column(FieldKey::MacdDif).unwrap();
        let dea = out.column(FieldKey::MacdDea).unwrap();
        let hist = out.column(FieldKey::MacdHistogram).unwrap();
        for i in 0..out.len() {
            assert!((hist[i] - (dif[i] - dea[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn test_existing_outputs_are_not_recomputed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut engine = IndicatorEngine::new();
        engine
            .register(Indicator::new("Counted", [FieldKey::DollarVolume], move |f| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![(FieldKey::DollarVolume, vec![1.0; f.len()])])
            }))
            .unwrap();

        let once = engine.preprocess(&frame(5), &[FieldKey::DollarVolume]).unwrap();
        engine.preprocess(&once, &[FieldKey::DollarVolume]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_fields_reported() {
        let mut engine = IndicatorEngine::new();
        engine.register(dollar_volume()).unwrap();

        let err = engine
            .preprocess(&frame(10), &[FieldKey::DollarVolume, FieldKey::MacdDea, FieldKey::Ma5])
            .unwrap_err();
        match err {
            ComputationError::MissingFields(fields) => {
                assert_eq!(fields, vec![FieldKey::Ma5, FieldKey::MacdDea]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_indicator_input_failure() {
        let mut engine = IndicatorEngine::new();
        engine
            .register(Indicator::new("NeedsMa5", [FieldKey::Ma10], |f| {
                let ma5 = input(f, "NeedsMa5", FieldKey::Ma5)?;
                Ok(vec![(FieldKey::Ma10, ma5.to_vec())])
            }))
            .unwrap();

        let err = engine.preprocess(&frame(10), &[FieldKey::Ma10]).unwrap_err();
        assert!(matches!(
            err,
            ComputationError::Indicator { ref indicator, .. } if indicator == "NeedsMa5"
        ));
        assert!(err.to_string().contains("MA5"));
    }

    #[test]
    fn test_empty_frame() {
        let engine = IndicatorEngine::with_builtin();
        let err = engine
            .preprocess(&HistoryFrame::empty("NONE"), &[FieldKey::Close])
            .unwrap_err();
        assert!(matches!(err, ComputationError::EmptyFrame(ref s) if s == "NONE"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut engine = IndicatorEngine::with_builtin();
        let err = engine.register(macd()).unwrap_err();
        assert!(matches!(err, ComputationError::DuplicateIndicator(ref n) if n == "MACD"));
    }

    #[test]
    fn test_raw_fields_need_no_indicator() {
        let engine = IndicatorEngine::new();
        let out = engine
            .preprocess(&frame(3), &[FieldKey::Close, FieldKey::Low])
            .unwrap();
        assert_eq!(out.len(), 3);
    }
}
