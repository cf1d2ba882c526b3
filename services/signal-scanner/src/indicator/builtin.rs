//! Built-in indicator families.

use super::math::{ema, rolling_mean};
use super::{input, Indicator};
use crate::data::FieldKey;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;

/// Dollar volume: close * volume.
pub fn dollar_volume() -> Indicator {
    Indicator::new("DollarVolume", [FieldKey::DollarVolume], |frame| {
        let close = input(frame, "DollarVolume", FieldKey::Close)?;
        let volume = input(frame, "DollarVolume", FieldKey::Volume)?;
        let values = close.iter().zip(volume).map(|(c, v)| c * v).collect();
        Ok(vec![(FieldKey::DollarVolume, values)])
    })
}

/// MA5 and MA10 of close.
pub fn moving_averages() -> Indicator {
    Indicator::new("MA", [FieldKey::Ma5, FieldKey::Ma10], |frame| {
        let close = input(frame, "MA", FieldKey::Close)?;
        Ok(vec![
            (FieldKey::Ma5, rolling_mean(close, 5)),
            (FieldKey::Ma10, rolling_mean(close, 10)),
        ])
    })
}

/// MACD(12, 26, 9) on close.
pub fn macd() -> Indicator {
    Indicator::new(
        "MACD",
        [FieldKey::MacdDif, FieldKey::MacdDea, FieldKey::MacdHistogram],
        |frame| {
            let close = input(frame, "MACD", FieldKey::Close)?;

            let fast = ema(close, MACD_FAST);
            let slow = ema(close, MACD_SLOW);
            let dif: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
            let dea = ema(&dif, MACD_SIGNAL);
            let histogram = dif.iter().zip(&dea).map(|(d, e)| d - e).collect();

            Ok(vec![
                (FieldKey::MacdDif, dif),
                (FieldKey::MacdDea, dea),
                (FieldKey::MacdHistogram, histogram),
            ])
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Bar, HistoryFrame};
    use chrono::NaiveDate;

    fn frame(closes: &[f64]) -> HistoryFrame {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 2_000.0,
            })
            .collect();
        HistoryFrame::from_bars("T", bars)
    }

    #[test]
    fn test_dollar_volume() {
        let cols = dollar_volume().compute(&frame(&[10.0, 12.5])).unwrap();
        assert_eq!(cols[0].0, FieldKey::DollarVolume);
        assert_eq!(cols[0].1, vec![20_000.0, 25_000.0]);
    }

    #[test]
    fn test_moving_average_warmup() {
        let closes: Vec<f64> = (1..=12).map(f64::from).collect();
        let cols = moving_averages().compute(&frame(&closes)).unwrap();

        let ma5 = &cols[0].1;
        let ma10 = &cols[1].1;
        assert_eq!(ma5.iter().filter(|v| v.is_nan()).count(), 4);
        assert_eq!(ma10.iter().filter(|v| v.is_nan()).count(), 9);
        assert!((ma5[11] - 10.0).abs() < 1e-9);
        assert!((ma10[11] - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let cols = macd().compute(&frame(&[50.0; 40])).unwrap();
        for (_, values) in cols {
            assert!(values.iter().all(|v| v.abs() < 1e-12));
        }
    }

    #[test]
    fn test_macd_rising_series_positive() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let cols = macd().compute(&frame(&closes)).unwrap();
        let dif = &cols[0].1;
        assert_eq!(dif[0], 0.0);
        assert!(dif[59] > 0.0);
    }
}
